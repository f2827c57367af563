//! Process-wide notification sink
//!
//! Holds at most one bound broadcast transport. Services address the sink
//! instead of the live transport, so they can be constructed before the
//! gateway that owns the transport has started.

use super::transport::{BroadcastTransport, RoomScope, TransportError};
use super::types::RoutingTarget;
use serde_json::Value;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, info};

static GLOBAL_SINK: LazyLock<Arc<NotificationSink>> =
    LazyLock::new(|| Arc::new(NotificationSink::new()));

/// Late-bound handle on the broadcast transport
///
/// Emitting while unbound is a no-op. Escalating a missing binding is left to
/// the caller (see `NotificationConfig::fail_on_delivery_error`).
#[derive(Default)]
pub struct NotificationSink {
    transport: RwLock<Option<Arc<dyn BroadcastTransport>>>,
}

impl NotificationSink {
    /// Create an unbound sink
    pub fn new() -> Self {
        Self {
            transport: RwLock::new(None),
        }
    }

    /// The process-wide sink shared by services built with `EntityService::new`
    pub fn global() -> Arc<NotificationSink> {
        GLOBAL_SINK.clone()
    }

    /// Bind a transport, replacing any previous binding
    pub fn bind(&self, transport: Arc<dyn BroadcastTransport>) {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(transport);

        if previous.is_some() {
            debug!("Broadcast transport rebound, previous binding dropped");
        } else {
            info!("Broadcast transport bound");
        }
    }

    /// Clear the binding, returning the transport that was bound
    pub fn unbind(&self) -> Option<Arc<dyn BroadcastTransport>> {
        let previous = self
            .transport
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if previous.is_some() {
            info!("Broadcast transport unbound");
        }
        previous
    }

    /// Clear the binding only if `transport` is the one currently bound
    pub fn unbind_if(&self, transport: &Arc<dyn BroadcastTransport>) -> bool {
        let mut bound = self.transport.write().unwrap_or_else(|e| e.into_inner());
        let same = bound
            .as_ref()
            .is_some_and(|current| same_transport(current, transport));
        if same {
            bound.take();
            info!("Broadcast transport unbound");
        }
        same
    }

    /// Whether a transport is currently bound
    pub fn has_transport(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Clone of the currently bound transport, if any
    pub fn transport(&self) -> Option<Arc<dyn BroadcastTransport>> {
        self.transport
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Emit an event through the bound transport
    ///
    /// Namespace resolution happens before channel resolution. Transport
    /// errors are returned to the caller; a missing binding is not an error.
    pub fn emit(
        &self,
        event: &str,
        payload: &Value,
        target: &RoutingTarget,
    ) -> Result<(), TransportError> {
        // Release the lock before calling into the transport
        let Some(transport) = self.transport() else {
            debug!(event = %event, "No broadcast transport bound, dropping event");
            return Ok(());
        };
        Self::emit_through(&*transport, event, payload, target)
    }

    /// Emit through a transport already taken from [`transport`](Self::transport)
    ///
    /// Lets a caller check for a binding and deliver against the same snapshot.
    pub fn emit_through(
        transport: &dyn BroadcastTransport,
        event: &str,
        payload: &Value,
        target: &RoutingTarget,
    ) -> Result<(), TransportError> {
        debug!(
            event = %event,
            namespace = ?target.namespace_ref(),
            channel = ?target.channel_ref(),
            "Emitting notification"
        );

        match target.namespace_ref() {
            Some(namespace) => {
                let scoped = transport.of(namespace)?;
                emit_in_scope(&*scoped, target.channel_ref(), event, payload)
            }
            None => emit_in_scope(transport, target.channel_ref(), event, payload),
        }
    }
}

// Compare data pointers only; vtable pointers may differ across codegen units
fn same_transport(a: &Arc<dyn BroadcastTransport>, b: &Arc<dyn BroadcastTransport>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn emit_in_scope<S: RoomScope + ?Sized>(
    scope: &S,
    channel: Option<&str>,
    event: &str,
    payload: &Value,
) -> Result<(), TransportError> {
    match channel {
        Some(channel) => scope.to(channel)?.emit(event, payload),
        None => scope.emit(event, payload),
    }
}
