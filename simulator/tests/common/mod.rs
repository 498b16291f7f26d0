use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use fleet_simulator::agent::TOKEN_HEADER;
use fleet_simulator::model::TelemetryReading;
use fleet_simulator::registry::DeviceIdentity;
use tokio::net::TcpListener;

/// Token that makes the collector answer 500.
pub const REJECT_TOKEN: &str = "reject";
/// Token that makes the collector stall well past any client timeout.
pub const STALL_TOKEN: &str = "stall";

#[derive(Debug, Clone)]
pub struct Received {
    pub token: String,
    pub content_type: String,
    pub reading: TelemetryReading,
}

#[derive(Clone, Default)]
pub struct MockCollector {
    received: Arc<Mutex<Vec<Received>>>,
}

impl MockCollector {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

async fn ingest(
    State(collector): State<MockCollector>,
    headers: HeaderMap,
    Json(reading): Json<TelemetryReading>,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let token = header(TOKEN_HEADER);

    match token.as_str() {
        REJECT_TOKEN => return StatusCode::INTERNAL_SERVER_ERROR,
        STALL_TOKEN => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            return StatusCode::OK;
        }
        _ => {}
    }

    collector.received.lock().unwrap().push(Received {
        token,
        content_type: header("content-type"),
        reading,
    });
    StatusCode::OK
}

/// Starts a collector on an ephemeral port and returns its ingest URL.
pub async fn spawn_collector() -> (MockCollector, String) {
    let collector = MockCollector::default();
    let app = Router::new()
        .route("/ingest", post(ingest))
        .with_state(collector.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (collector, format!("http://{addr}/ingest"))
}

pub fn device(id: u32) -> DeviceIdentity {
    DeviceIdentity {
        device_id: id,
        serial: format!("S{id}"),
        name: format!("Sensor{id}"),
        location: "Lab".to_string(),
    }
}
