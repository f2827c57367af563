//! Errors surfaced by entity services

use crate::events::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Everything an `EntityService` call can fail with
///
/// Backend failures always propagate. The notification variants only reach
/// the caller when the service opted in with `fail_on_delivery_error`.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required argument was missing or unusable
    #[error("{0}")]
    InvalidArgument(String),

    /// Raised by the query backend, passed through unchanged
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    /// Notifications are enabled but no transport was ever bound
    #[error("Broadcast transport not initialized. Bind a NotificationGateway before emitting notifications.")]
    DeliveryUnavailable,

    /// The transport failed while resolving a scope or emitting
    #[error("notification delivery failed: {0}")]
    Delivery(#[from] TransportError),

    /// Result data could not be turned into a notification payload
    #[error("failed to serialize notification payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ServiceError {
    /// Whether this error comes from the notification step rather than the data operation
    pub fn is_notification_error(&self) -> bool {
        matches!(
            self,
            ServiceError::DeliveryUnavailable | ServiceError::Delivery(_) | ServiceError::Payload(_)
        )
    }
}
