//! Notification gateway lifecycle
//!
//! The gateway owns the in-process [`EventBus`] that WebSocket clients
//! subscribe to, and binds it into a [`NotificationSink`] once it is ready to
//! serve.

use super::routes::create_router;
use crate::events::{BroadcastTransport, EventBus, NotificationSink};
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Shared state handed to the HTTP and WebSocket handlers
#[derive(Clone)]
pub struct GatewayState {
    pub bus: Arc<EventBus>,
    pub sink: Arc<NotificationSink>,
}

/// Owner of the broadcast transport services notify through
pub struct NotificationGateway {
    bus: Arc<EventBus>,
    sink: Arc<NotificationSink>,
}

impl NotificationGateway {
    /// Create a gateway whose bus buffers up to `capacity` events per subscriber
    pub fn new(sink: Arc<NotificationSink>, capacity: usize) -> Self {
        Self {
            bus: Arc::new(EventBus::new(capacity)),
            sink,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sink(&self) -> &Arc<NotificationSink> {
        &self.sink
    }

    fn transport(&self) -> Arc<dyn BroadcastTransport> {
        self.bus.clone()
    }

    /// Lifecycle hook: bind this gateway's bus into the sink
    pub fn after_init(&self) {
        self.sink.bind(self.transport());
        info!("Notification gateway initialized");
    }

    /// Close the bus and release the sink if it still points at it
    pub fn shutdown(&self) {
        self.bus.close();
        let released = self.sink.unbind_if(&self.transport());
        info!(released, "Notification gateway shut down");
    }

    pub fn state(&self) -> GatewayState {
        GatewayState {
            bus: self.bus.clone(),
            sink: self.sink.clone(),
        }
    }

    /// HTTP router serving health and the WebSocket stream at `ws_path`
    pub fn router(&self, ws_path: &str) -> Router {
        create_router(self.state(), ws_path)
    }
}
