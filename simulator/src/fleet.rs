use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::agent::{Collector, DeliveryOutcome, DeviceAgent};
use crate::credentials::Credentials;
use crate::metrics::{ACTIVE_DEVICES, TICKS_TOTAL};
use crate::model::FleetStatus;
use crate::registry::DeviceIdentity;

/// Fast-mode tick period. The slow mode is 300000 ms (5 min).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2000;

/// The set of active devices. Fixed once assembled.
#[derive(Debug, Default)]
pub struct Fleet {
    agents: Vec<Arc<DeviceAgent>>,
}

impl Fleet {
    /// Builds one agent per registry entry that has a token, in registry order.
    /// Devices without a token are left out for the rest of the run.
    pub fn assemble(
        devices: Vec<DeviceIdentity>,
        credentials: &Credentials,
        collector: &Collector,
    ) -> Self {
        let mut agents = Vec::with_capacity(devices.len());

        for identity in devices {
            let Some(token) = credentials.get(identity.device_id) else {
                warn!(
                    device_id = identity.device_id,
                    "No token found for device, excluding it from the fleet"
                );
                continue;
            };
            agents.push(Arc::new(DeviceAgent::new(
                identity,
                token.to_string(),
                collector.clone(),
            )));
        }

        info!("Fleet assembled with {} active devices", agents.len());
        Self::from_agents(agents)
    }

    pub fn from_agents(agents: Vec<Arc<DeviceAgent>>) -> Self {
        ACTIVE_DEVICES.set(agents.len() as f64);
        Self { agents }
    }

    pub fn agents(&self) -> &[Arc<DeviceAgent>] {
        &self.agents
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn status(&self) -> FleetStatus {
        FleetStatus {
            status: "running".to_string(),
            active_devices: self.agents.len(),
        }
    }

    /// Launches one independent delivery task per device and returns without
    /// waiting on any of them. Order of dispatch and completion is unspecified.
    pub fn tick(&self) -> Vec<JoinHandle<DeliveryOutcome>> {
        TICKS_TOTAL.inc();
        debug!("Tick: dispatching {} devices", self.agents.len());

        self.agents
            .iter()
            .map(|agent| {
                let agent = Arc::clone(agent);
                tokio::spawn(async move { agent.push_once().await })
            })
            .collect()
    }
}

/// Drives fleet ticks: one immediately on start, then one per period.
#[derive(Debug)]
pub struct FleetScheduler {
    fleet: Arc<Fleet>,
    period: Duration,
    running: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl FleetScheduler {
    pub fn new(fleet: Arc<Fleet>, period: Duration) -> Self {
        Self {
            fleet,
            period,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }

        let fleet = Arc::clone(&self.fleet);
        let period = self.period;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            info!("Scheduler started, tick every {:?}", period);
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Deliveries are detached; stragglers may overlap the next tick.
                        let _ = fleet.tick();
                    }
                    _ = &mut shutdown_rx => break,
                }
            }

            info!("Scheduler stopped");
        });

        self.running = Some((shutdown_tx, handle));
    }

    pub async fn stop(&mut self) {
        if let Some((shutdown_tx, handle)) = self.running.take() {
            let _ = shutdown_tx.send(());
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
    }
}
