//! Mutation notification bridge
//!
//! This module provides:
//! - `NotificationSink` — late-bound, process-wide handle on a broadcast transport
//! - `BroadcastTransport` — the namespace → channel → emit capability set a transport must offer
//! - `EventBus` — in-process transport distributing events to WebSocket clients
//! - `NotifyAction` / `NotificationContext` / `RoutingTarget` — per-call notification values

mod bus;
mod sink;
mod transport;
mod types;

pub use bus::{normalize_namespace, EventBus, DEFAULT_CAPACITY, ROOT_NAMESPACE};
pub use sink::NotificationSink;
pub use transport::{BroadcastTarget, BroadcastTransport, RoomScope, TransportError};
pub use types::{BroadcastEvent, NotificationContext, NotifyAction, RoutingTarget};
