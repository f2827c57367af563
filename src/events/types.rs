//! Notification types shared by the sink, the transports and the entity services

use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutation that triggered a notification
///
/// Serialized names double as the default event names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotifyAction {
    Create,
    CreateMany,
    Bulk,
    Update,
    Remove,
    Purge,
}

impl NotifyAction {
    /// All actions, in declaration order
    pub const ALL: [NotifyAction; 6] = [
        NotifyAction::Create,
        NotifyAction::CreateMany,
        NotifyAction::Bulk,
        NotifyAction::Update,
        NotifyAction::Remove,
        NotifyAction::Purge,
    ];

    /// Default event name for this action
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyAction::Create => "create",
            NotifyAction::CreateMany => "createMany",
            NotifyAction::Bulk => "bulk",
            NotifyAction::Update => "update",
            NotifyAction::Remove => "remove",
            NotifyAction::Purge => "purge",
        }
    }
}

impl fmt::Display for NotifyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addressing for a single emit call
///
/// Both fields unset means the root of the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl RoutingTarget {
    pub fn new(channel: Option<String>, namespace: Option<String>) -> Self {
        Self { channel, namespace }
    }

    /// Target a channel on the root namespace
    pub fn channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            namespace: None,
        }
    }

    /// Target a whole namespace
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            channel: None,
            namespace: Some(namespace.into()),
        }
    }

    /// Narrow to a channel within the current namespace
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Namespace to resolve, ignoring empty strings
    pub fn namespace_ref(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// Channel to resolve, ignoring empty strings
    pub fn channel_ref(&self) -> Option<&str> {
        self.channel.as_deref().filter(|ch| !ch.is_empty())
    }
}

/// Everything a payload builder gets to see about a mutation
///
/// Built once per mutating call and dropped right after the payload is derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationContext {
    pub action: NotifyAction,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// A frame carried by the in-process [`EventBus`](super::EventBus)
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Unique frame id, lets clients drop duplicates
    pub id: uuid::Uuid,
    /// Event name (action name or configured override)
    pub event: String,
    /// Payload produced by the service
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Normalized namespace, `/` for root emissions
    pub namespace: String,
    /// Channel within the namespace, absent for namespace-wide emissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl BroadcastEvent {
    /// Create a new frame with a fresh id and the current timestamp
    pub fn new(
        event: impl Into<String>,
        payload: serde_json::Value,
        namespace: impl Into<String>,
        channel: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            event: event.into(),
            payload,
            namespace: namespace.into(),
            channel,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
