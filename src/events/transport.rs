//! Capability traits a broadcast transport must offer
//!
//! The sink only needs hierarchical addressing with a terminal emit:
//! - `BroadcastTarget` — something events can be emitted on
//! - `RoomScope` — a target that can also narrow to a channel (`to`)
//! - `BroadcastTransport` — the root, which can also scope to a namespace (`of`)

use serde_json::Value;
use thiserror::Error;

/// Failures raised by a transport while resolving a scope or emitting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid namespace '{0}'")]
    InvalidNamespace(String),

    #[error("invalid channel '{0}'")]
    InvalidChannel(String),

    #[error("broadcast transport is closed")]
    Closed,

    #[error("broadcast failed: {0}")]
    Failed(String),
}

/// Terminal emission point
pub trait BroadcastTarget: Send + Sync {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError>;
}

/// A target that can be narrowed to a single channel
pub trait RoomScope: BroadcastTarget {
    fn to(&self, channel: &str) -> Result<Box<dyn BroadcastTarget + '_>, TransportError>;
}

/// The root of a transport, able to resolve namespace-scoped sub-transports
pub trait BroadcastTransport: RoomScope {
    fn of(&self, namespace: &str) -> Result<Box<dyn RoomScope + '_>, TransportError>;
}
