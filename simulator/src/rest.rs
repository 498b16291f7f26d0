use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::errors::{Error, Result};
use crate::fleet::Fleet;
use crate::metrics;
use crate::model::FleetStatus;

#[derive(Debug, Clone)]
struct AppState {
    fleet: Arc<Fleet>,
}

pub fn create_router(fleet: Arc<Fleet>) -> Router {
    let state = AppState { fleet };

    Router::new()
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

async fn get_health(State(state): State<AppState>) -> Json<FleetStatus> {
    Json(state.fleet.status())
}

async fn get_metrics() -> std::result::Result<String, AppError> {
    Ok(metrics::gather_metrics()?)
}

struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {}", self.0),
        )
            .into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// Handle to the running health server.
#[derive(Debug)]
pub struct HealthServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl HealthServer {
    pub async fn spawn(addr: SocketAddr, fleet: Arc<Fleet>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let app = create_router(fleet);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("Health server listening on {}", addr);
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Health server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!("Health server task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use crate::agent::Collector;
    use crate::credentials::Credentials;
    use crate::registry::DeviceIdentity;

    fn fleet_of(ids: &[u32], with_token: &[u32]) -> Arc<Fleet> {
        let devices = ids
            .iter()
            .map(|&id| DeviceIdentity {
                device_id: id,
                serial: format!("S{id}"),
                name: format!("Sensor{id}"),
                location: "Lab".to_string(),
            })
            .collect();
        let credentials: Credentials = with_token
            .iter()
            .map(|&id| (id, format!("token-{id}")))
            .collect();
        let collector =
            Collector::new("http://127.0.0.1:9/ingest", Duration::from_millis(200)).unwrap();
        Arc::new(Fleet::assemble(devices, &credentials, &collector))
    }

    #[tokio::test]
    async fn test_health_reports_active_devices() {
        let router = create_router(fleet_of(&[1, 2, 3], &[1, 3]));

        let request = Request::builder()
            .uri("/health")
            .method(Method::GET)
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"status":"running","activeDevices":2}"#);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_responds() {
        let router = create_router(fleet_of(&[], &[]));

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = create_router(fleet_of(&[], &[]));

        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
