//! HTTP and WebSocket surface of the notification gateway

pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod ws_handlers;

pub use gateway::{GatewayState, NotificationGateway};
pub use routes::{create_router, DEFAULT_WS_PATH};
