//! HTTP request handlers

use super::gateway::GatewayState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether the sink currently has a transport to deliver through
    pub transport_bound: bool,
    /// Connected WebSocket clients
    pub subscribers: usize,
}

/// Health check handler
///
/// Returns 200 + `"ok"` while the bus accepts events, 503 + `"closed"` once the
/// gateway has shut down.
pub async fn health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let (http_status, status) = if state.bus.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "closed")
    } else {
        (StatusCode::OK, "ok")
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            transport_bound: state.sink.has_transport(),
            subscribers: state.bus.subscriber_count(),
        }),
    )
}
