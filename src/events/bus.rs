//! In-process broadcast transport backed by `tokio::sync::broadcast`

use super::transport::{BroadcastTarget, BroadcastTransport, RoomScope, TransportError};
use super::types::BroadcastEvent;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Default broadcast channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// Namespace used for emissions that don't name one
pub const ROOT_NAMESPACE: &str = "/";

/// Event bus that distributes [`BroadcastEvent`]s to WebSocket clients
///
/// Fire-and-forget: if no subscribers are connected, events are silently
/// dropped. Once closed, every emit fails with [`TransportError::Closed`].
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BroadcastEvent>,
    closed: Arc<watch::Sender<bool>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            closed: Arc::new(closed),
        }
    }

    /// Subscribe to receive events (for WebSocket clients)
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Refuse any further emission
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the bus is closed, immediately if it already is
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so the wait cannot fail while borrowed
        let _ = rx.wait_for(|closed| *closed).await;
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn publish(
        &self,
        namespace: &str,
        channel: Option<&str>,
        event: &str,
        payload: &Value,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;

        let frame = BroadcastEvent::new(
            event,
            payload.clone(),
            namespace,
            channel.map(str::to_string),
        );
        match self.sender.send(frame) {
            Ok(n) => {
                debug!(
                    event = %event,
                    namespace = %namespace,
                    channel = ?channel,
                    subscribers = n,
                    "BroadcastEvent emitted"
                );
            }
            Err(_) => {
                // No subscribers — this is expected and fine
            }
        }
        Ok(())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Normalize a namespace to its `/`-prefixed form
pub fn normalize_namespace(namespace: &str) -> Result<String, TransportError> {
    let trimmed = namespace.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(TransportError::InvalidNamespace(namespace.to_string()));
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

fn validate_channel(channel: &str) -> Result<(), TransportError> {
    if channel.is_empty() || channel.chars().any(char::is_whitespace) {
        return Err(TransportError::InvalidChannel(channel.to_string()));
    }
    Ok(())
}

/// A namespace on the bus
struct NamespaceScope<'a> {
    bus: &'a EventBus,
    namespace: String,
}

/// A channel within a namespace
struct ChannelScope<'a> {
    bus: &'a EventBus,
    namespace: String,
    channel: String,
}

impl BroadcastTarget for ChannelScope<'_> {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        self.bus
            .publish(&self.namespace, Some(&self.channel), event, payload)
    }
}

impl BroadcastTarget for NamespaceScope<'_> {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        self.bus.publish(&self.namespace, None, event, payload)
    }
}

impl RoomScope for NamespaceScope<'_> {
    fn to(&self, channel: &str) -> Result<Box<dyn BroadcastTarget + '_>, TransportError> {
        self.bus.ensure_open()?;
        validate_channel(channel)?;
        Ok(Box::new(ChannelScope {
            bus: self.bus,
            namespace: self.namespace.clone(),
            channel: channel.to_string(),
        }))
    }
}

impl BroadcastTarget for EventBus {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        self.publish(ROOT_NAMESPACE, None, event, payload)
    }
}

impl RoomScope for EventBus {
    fn to(&self, channel: &str) -> Result<Box<dyn BroadcastTarget + '_>, TransportError> {
        self.ensure_open()?;
        validate_channel(channel)?;
        Ok(Box::new(ChannelScope {
            bus: self,
            namespace: ROOT_NAMESPACE.to_string(),
            channel: channel.to_string(),
        }))
    }
}

impl BroadcastTransport for EventBus {
    fn of(&self, namespace: &str) -> Result<Box<dyn RoomScope + '_>, TransportError> {
        self.ensure_open()?;
        Ok(Box::new(NamespaceScope {
            bus: self,
            namespace: normalize_namespace(namespace)?,
        }))
    }
}
