use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::errors::{Error, Result};
use crate::fleet::DEFAULT_TICK_INTERVAL_MS;

/// Runtime configuration, read from flags or the matching environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "fleet-simulator", about = "Simulated IoT device fleet pushing telemetry over HTTP")]
pub struct Config {
    /// Collector endpoint that receives every reading
    #[arg(long, env = "TARGET_API_URL", default_value = "http://localhost:3000/api/telemetry")]
    pub target_api_url: String,

    /// Port of the health endpoint
    #[arg(long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// JSON file listing the simulated devices
    #[arg(long, env = "DEVICES_FILE", default_value = "devices.json")]
    pub devices_file: PathBuf,

    /// Period between fleet ticks. 2000 ms is the fast mode, 300000 ms (5 min) the slow one.
    #[arg(long, env = "TICK_INTERVAL_MS", default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    pub tick_interval_ms: u64,

    /// Upper bound on a single delivery round-trip
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick interval must be greater than zero".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request timeout must be greater than zero".to_string()));
        }
        if self.target_api_url.trim().is_empty() {
            return Err(Error::Config("target API URL cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
