use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::generator::SignalGenerator;
use crate::metrics::{DELIVERIES_TOTAL, DELIVERY_FAILURES_TOTAL, DELIVERY_LATENCY_SECONDS};
use crate::model::TelemetryReading;
use crate::registry::DeviceIdentity;

pub const TOKEN_HEADER: &str = "x-device-token";

/// Shared HTTP handle to the collector endpoint.
#[derive(Debug, Clone)]
pub struct Collector {
    client: reqwest::Client,
    endpoint: Arc<str>,
}

impl Collector {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: Arc::from(endpoint),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, token: &str, reading: &TelemetryReading) -> Result<()> {
        let response = self
            .client
            .post(&*self.endpoint)
            .header(TOKEN_HEADER, token)
            .json(reading)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rejected { status });
        }
        Ok(())
    }
}

/// Result of a single delivery attempt. Failures are reported, never raised.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered(TelemetryReading),
    Failed { device_id: u32, reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

/// A simulated device: identity, token and its own signal state.
#[derive(Debug)]
pub struct DeviceAgent {
    identity: DeviceIdentity,
    token: String,
    generator: Mutex<SignalGenerator>,
    collector: Collector,
}

impl DeviceAgent {
    pub fn new(identity: DeviceIdentity, token: String, collector: Collector) -> Self {
        let generator = SignalGenerator::new(identity.device_id);
        Self::with_generator(identity, token, generator, collector)
    }

    pub fn with_generator(
        identity: DeviceIdentity,
        token: String,
        generator: SignalGenerator,
        collector: Collector,
    ) -> Self {
        Self {
            identity,
            token,
            generator: Mutex::new(generator),
            collector,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Generates one reading and posts it. Never retries and never fails:
    /// every error is logged here and folded into the returned outcome.
    pub async fn push_once(&self) -> DeliveryOutcome {
        // The lock covers state mutation only, not the network round-trip.
        let reading = self.generator.lock().await.generate();
        let device = &self.identity;

        debug!(device_id = device.device_id, "Pushing reading to {}", self.collector.endpoint());

        let start = Instant::now();
        let result = self.collector.post(&self.token, &reading).await;
        DELIVERY_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                DELIVERIES_TOTAL.inc();
                info!(
                    device_id = device.device_id,
                    "[{} @ {}] temp={} hum={} bat={} ts={}",
                    device.name,
                    device.location,
                    reading.temperature,
                    reading.humidity,
                    reading.battery,
                    reading.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
                );
                DeliveryOutcome::Delivered(reading)
            }
            Err(e) => {
                DELIVERY_FAILURES_TOTAL.inc();
                warn!(
                    device_id = device.device_id,
                    serial = %device.serial,
                    error = %e,
                    "Delivery failed for {}",
                    device.name
                );
                DeliveryOutcome::Failed {
                    device_id: device.device_id,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity {
            device_id: 4,
            serial: "S4".to_string(),
            name: "Sensor4".to_string(),
            location: "Basement".to_string(),
        }
    }

    #[test]
    fn test_unreachable_collector_is_absorbed() {
        tokio_test::block_on(async {
            // Port 9 (discard) on localhost is closed in test environments.
            let collector =
                Collector::new("http://127.0.0.1:9/ingest", Duration::from_millis(500)).unwrap();
            let agent = DeviceAgent::new(identity(), "tok".to_string(), collector);

            let outcome = agent.push_once().await;

            match outcome {
                DeliveryOutcome::Failed { device_id, reason } => {
                    assert_eq!(device_id, 4);
                    assert!(!reason.is_empty());
                }
                DeliveryOutcome::Delivered(_) => panic!("delivery to a closed port succeeded"),
            }
        });
    }

    #[test]
    fn test_state_advances_even_when_delivery_fails() {
        tokio_test::block_on(async {
            let collector =
                Collector::new("http://127.0.0.1:9/ingest", Duration::from_millis(500)).unwrap();
            let agent = DeviceAgent::with_generator(
                identity(),
                "tok".to_string(),
                SignalGenerator::with_battery(4, 0.3),
                collector,
            );

            agent.push_once().await;

            assert_eq!(agent.generator.lock().await.battery_level(), 100.0);
        });
    }
}
