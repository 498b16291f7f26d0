use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fleet_simulator::agent::Collector;
use fleet_simulator::config::Config;
use fleet_simulator::credentials::Credentials;
use fleet_simulator::fleet::{Fleet, FleetScheduler};
use fleet_simulator::registry::load_registry;
use fleet_simulator::metrics;
use fleet_simulator::rest::HealthServer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_simulator=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("Simulator failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::parse();
    config.validate()?;

    info!("Starting IoT fleet simulator");
    info!(
        "Collector: {}, tick: {:?}, timeout: {:?}",
        config.target_api_url,
        config.tick_interval(),
        config.request_timeout()
    );

    metrics::init_metrics().context("failed to register metrics")?;

    let devices = load_registry(&config.devices_file).context("cannot start without a device registry")?;
    let credentials = Credentials::from_env(&devices);
    let collector = Collector::new(&config.target_api_url, config.request_timeout())
        .context("failed to build HTTP client")?;

    let fleet = Arc::new(Fleet::assemble(devices, &credentials, &collector));
    if fleet.is_empty() {
        warn!("No device tokens found, the fleet will not send anything");
    }

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let server = HealthServer::spawn(http_addr, Arc::clone(&fleet))
        .await
        .with_context(|| format!("failed to bind health server to {http_addr}"))?;

    let mut scheduler = FleetScheduler::new(fleet, config.tick_interval());
    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    scheduler.stop().await;
    server.shutdown().await;

    info!("Shutting down");
    Ok(())
}
