//! API route definitions

use super::gateway::GatewayState;
use super::handlers;
use super::ws_handlers;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default path of the WebSocket events endpoint
pub const DEFAULT_WS_PATH: &str = "/ws/events";

/// Create the API router
pub fn create_router(state: GatewayState, ws_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Notification stream
        .route(ws_path, get(ws_handlers::ws_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
