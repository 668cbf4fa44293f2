//! Reference receiver.
//!
//! A minimal collector speaking the transmission protocol: `POST /` with a
//! plain-text body, answered with `200 OK`. Used by the `data-sink` binary
//! and by the integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Body returned for an accepted payload.
pub const ACCEPTED_BODY: &str = "Data successfully received";

/// Shared receiver state.
#[derive(Debug, Clone)]
pub struct AppState {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
    accepting: Arc<AtomicBool>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Create an empty receiver that accepts payloads.
    pub fn new() -> Self {
        Self {
            payloads: Arc::new(Mutex::new(Vec::new())),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Toggle whether payloads are accepted. A rejecting receiver answers
    /// `503 Service Unavailable` and keeps nothing.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Release);
    }

    /// Payloads received so far, in arrival order.
    pub async fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().await.clone()
    }

    /// Number of payloads received so far.
    pub async fn received(&self) -> usize {
        self.payloads.lock().await.len()
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    received: usize,
}

/// Create the receiver router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(receive_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

/// Serve `state` on `listener` until `token` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    token: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Receiver listening");
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(token.cancelled_owned())
        .await
}

/// Accept one payload.
async fn receive_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    if !state.accepting.load(Ordering::Acquire) {
        tracing::warn!(bytes = body.len(), "Rejecting payload");
        return (StatusCode::SERVICE_UNAVAILABLE, "Receiver is not accepting data");
    }

    tracing::info!(bytes = body.len(), "Received data");
    tracing::debug!(data = %String::from_utf8_lossy(&body), "Payload");
    state.payloads.lock().await.push(body.to_vec());

    (StatusCode::OK, ACCEPTED_BODY)
}

/// Liveness check.
async fn healthz_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        received: state.received().await,
    })
}
