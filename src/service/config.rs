//! Per-service notification configuration

use crate::events::{NotificationContext, NotifyAction, RoutingTarget};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns a notification context into the payload sent on the wire
pub type PayloadBuilder = Arc<dyn Fn(&NotificationContext) -> serde_json::Value + Send + Sync>;

/// Which mutations notify, where, and how delivery failures are treated
///
/// Everything defaults to off: a service built without a config, or with
/// `enabled: false`, never touches the sink.
///
/// ```yaml
/// enabled: true
/// namespace: /inventory
/// channel: widgets
/// service: widgets
/// events:
///   create: widgets.created
/// fail_on_delivery_error: false
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch
    pub enabled: bool,
    pub channel: Option<String>,
    pub namespace: Option<String>,
    /// Identity of the emitting service, handed to payload builders
    pub service: Option<String>,
    /// Event name overrides; unmapped actions use their own name
    pub events: HashMap<NotifyAction, String>,
    /// Custom payload; absent means the raw result data is sent
    #[serde(skip)]
    pub payload_builder: Option<PayloadBuilder>,
    /// Surface notification failures to the caller of the mutating operation
    #[serde(alias = "throw_on_error")]
    pub fail_on_delivery_error: bool,
}

impl NotificationConfig {
    /// An enabled config with default routing
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Rename the event emitted for `action`
    pub fn with_event(mut self, action: NotifyAction, event: impl Into<String>) -> Self {
        self.events.insert(action, event.into());
        self
    }

    pub fn with_payload_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&NotificationContext) -> serde_json::Value + Send + Sync + 'static,
    {
        self.payload_builder = Some(Arc::new(builder));
        self
    }

    pub fn with_fail_on_delivery_error(mut self, fail: bool) -> Self {
        self.fail_on_delivery_error = fail;
        self
    }

    /// Event name for `action`: the configured override, else the action name
    pub fn event_name(&self, action: NotifyAction) -> &str {
        self.events
            .get(&action)
            .map(String::as_str)
            .unwrap_or_else(|| action.as_str())
    }

    /// Routing target built from the configured channel and namespace
    pub fn routing_target(&self) -> RoutingTarget {
        RoutingTarget::new(self.channel.clone(), self.namespace.clone())
    }
}

impl fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("enabled", &self.enabled)
            .field("channel", &self.channel)
            .field("namespace", &self.namespace)
            .field("service", &self.service)
            .field("events", &self.events)
            .field("payload_builder", &self.payload_builder.is_some())
            .field("fail_on_delivery_error", &self.fail_on_delivery_error)
            .finish()
    }
}
