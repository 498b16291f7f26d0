pub mod agent;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod fleet;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod rest;
