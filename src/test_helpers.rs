//! Test helper factories and recording transports
//!
//! Provides a sample `Widget` entity and transports that record every scope
//! resolution and emission, optionally failing on emit.
#![allow(dead_code)]

use crate::events::{BroadcastTarget, BroadcastTransport, RoomScope, TransportError};
use crate::service::{Entity, EntityKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

// ============================================================================
// Sample entity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl WidgetPatch {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

impl Entity for Widget {
    type Patch = WidgetPatch;

    fn key(&self) -> Option<EntityKey> {
        Some(EntityKey::Int(self.id))
    }
}

/// Create a widget with zero quantity
pub fn widget(id: i64, name: &str) -> Widget {
    Widget {
        id,
        name: name.to_string(),
        quantity: 0,
    }
}

// ============================================================================
// Recording transport
// ============================================================================

/// A scope resolution or emission observed by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Of(String),
    To(String),
    Emit(String, Value),
}

/// Transport recording calls in order across every scope it hands out
#[derive(Clone, Default)]
pub struct RecordingTransport {
    calls: Arc<Mutex<Vec<TransportCall>>>,
    fail_emit: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose emits always fail
    pub fn failing() -> Self {
        Self {
            fail_emit: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl BroadcastTarget for RecordingTransport {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        self.record(TransportCall::Emit(event.to_string(), payload.clone()));
        if self.fail_emit {
            return Err(TransportError::Failed("socket write failed".into()));
        }
        Ok(())
    }
}

impl RoomScope for RecordingTransport {
    fn to(&self, channel: &str) -> Result<Box<dyn BroadcastTarget + '_>, TransportError> {
        self.record(TransportCall::To(channel.to_string()));
        Ok(Box::new(self.clone()))
    }
}

impl BroadcastTransport for RecordingTransport {
    fn of(&self, namespace: &str) -> Result<Box<dyn RoomScope + '_>, TransportError> {
        self.record(TransportCall::Of(namespace.to_string()));
        Ok(Box::new(self.clone()))
    }
}
