//! Generic entity service
//!
//! Forwards CRUD operations to a `QueryBackend` and, after each successful
//! mutation, notifies the sink according to the service's `NotificationConfig`.

use super::config::NotificationConfig;
use super::error::{Result, ServiceError};
use super::models::*;
use super::traits::{Entity, QueryBackend};
use crate::events::{NotificationContext, NotificationSink, NotifyAction};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Base service for one entity type
pub struct EntityService<T: Entity> {
    backend: Arc<dyn QueryBackend<T>>,
    repository: RepositoryHandle,
    notifications: Option<NotificationConfig>,
    sink: Arc<NotificationSink>,
}

impl<T: Entity> EntityService<T> {
    /// Create a service notifying through the process-wide sink
    pub fn new(
        backend: Arc<dyn QueryBackend<T>>,
        repository: RepositoryHandle,
        notifications: Option<NotificationConfig>,
    ) -> Self {
        Self::with_sink(
            backend,
            repository,
            notifications,
            NotificationSink::global(),
        )
    }

    /// Create a service notifying through the given sink
    pub fn with_sink(
        backend: Arc<dyn QueryBackend<T>>,
        repository: RepositoryHandle,
        notifications: Option<NotificationConfig>,
        sink: Arc<NotificationSink>,
    ) -> Self {
        Self {
            backend,
            repository,
            notifications,
            sink,
        }
    }

    pub fn repository(&self) -> &RepositoryHandle {
        &self.repository
    }

    pub fn notifications(&self) -> Option<&NotificationConfig> {
        self.notifications.as_ref()
    }

    pub fn sink(&self) -> &Arc<NotificationSink> {
        &self.sink
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a record
    pub async fn create(&self, data: T::Patch, relations: &[String]) -> Result<T> {
        let result = self
            .backend
            .create(&self.repository, data, relations)
            .await?;
        self.notify(NotifyAction::Create, &result)?;
        Ok(result)
    }

    /// Create `qty` records from the same template
    ///
    /// Records are created one after another; a single notification carries
    /// the whole batch once every create has completed.
    pub async fn create_many(&self, qty: usize, data: T::Patch) -> Result<Vec<T>> {
        let mut results = Vec::with_capacity(qty);
        for _ in 0..qty {
            let result = self
                .backend
                .create(&self.repository, data.clone(), &[])
                .await?;
            results.push(result);
        }

        self.notify(NotifyAction::CreateMany, &results)?;
        Ok(results)
    }

    /// Bulk insert, upsert or delete records
    pub async fn bulk(
        &self,
        data: Vec<T::Patch>,
        mode: ImportMode,
        dedup_field: Option<&str>,
    ) -> Result<BulkUploadResponse> {
        let result = self
            .backend
            .bulk(&self.repository, data, mode, dedup_field)
            .await?;
        self.notify(NotifyAction::Bulk, &result)?;
        Ok(result)
    }

    /// Update a record; `relations` are loaded into the returned record
    pub async fn update(&self, data: T::Patch, relations: &[String]) -> Result<T> {
        let result = self
            .backend
            .update(&self.repository, data, relations)
            .await?;
        self.notify(NotifyAction::Update, &result)?;
        Ok(result)
    }

    /// Soft delete, can be restored if needed
    pub async fn remove(&self, record: T) -> Result<T> {
        let result = self.backend.remove(&self.repository, record).await?;
        self.notify(NotifyAction::Remove, &result)?;
        Ok(result)
    }

    /// Delete the record permanently
    ///
    /// The backend returns nothing, so the notification carries the input record.
    pub async fn purge(&self, record: T) -> Result<()> {
        self.backend.purge(&self.repository, &record).await?;
        self.notify(NotifyAction::Purge, &record)?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find_all(&self, options: &FindOptions) -> Result<Vec<T>> {
        Ok(self.backend.find_all(&self.repository, options).await?)
    }

    pub async fn find_one(&self, options: &FindOptions) -> Result<Option<T>> {
        Ok(self.backend.find_one(&self.repository, options).await?)
    }

    /// Find a record by id; a missing, zero or empty id is rejected before the backend is asked
    pub async fn find_by_id(
        &self,
        id: Option<EntityKey>,
        relations: &[String],
    ) -> Result<Option<T>> {
        let id = match id {
            Some(id) if !id.is_blank() => id,
            _ => return Err(ServiceError::InvalidArgument("ID is required".to_string())),
        };
        Ok(self
            .backend
            .find_one_by_id(&self.repository, &id, relations)
            .await?)
    }

    pub async fn count(&self, options: &FindOptions) -> Result<u64> {
        Ok(self.backend.count(&self.repository, options).await?)
    }

    pub async fn sum(&self, metric: &str, options: &FindOptions) -> Result<f64> {
        Ok(self.backend.sum(&self.repository, metric, options).await?)
    }

    pub async fn avg(&self, metric: &str, options: &FindOptions) -> Result<f64> {
        Ok(self.backend.avg(&self.repository, metric, options).await?)
    }

    pub async fn raw(&self, query: &str) -> Result<serde_json::Value> {
        Ok(self.backend.raw(&self.repository, query).await?)
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Notify the sink about a completed mutation
    ///
    /// The data mutation has already happened when this runs. Failures are
    /// logged and dropped unless `fail_on_delivery_error` is set.
    fn notify<D: Serialize + ?Sized>(&self, action: NotifyAction, data: &D) -> Result<()> {
        let Some(config) = self.notifications.as_ref().filter(|c| c.enabled) else {
            return Ok(());
        };

        match self.deliver(config, action, data) {
            Ok(()) => Ok(()),
            Err(e) if config.fail_on_delivery_error => Err(e),
            Err(e) => {
                warn!(
                    repository = %self.repository,
                    action = %action,
                    "Notification dropped: {}",
                    e
                );
                Ok(())
            }
        }
    }

    fn deliver<D: Serialize + ?Sized>(
        &self,
        config: &NotificationConfig,
        action: NotifyAction,
        data: &D,
    ) -> Result<()> {
        let event = config.event_name(action);
        let context = NotificationContext {
            action,
            data: serde_json::to_value(data)?,
            channel: config.channel.clone(),
            namespace: config.namespace.clone(),
            service: config.service.clone(),
        };
        let payload = match config.payload_builder.as_ref() {
            Some(build) => build(&context),
            None => context.data,
        };

        // One snapshot for both the binding check and the emit
        let Some(transport) = self.sink.transport() else {
            if config.fail_on_delivery_error {
                return Err(ServiceError::DeliveryUnavailable);
            }
            debug!(
                repository = %self.repository,
                event = %event,
                "No broadcast transport bound, skipping notification"
            );
            return Ok(());
        };

        NotificationSink::emit_through(&*transport, event, &payload, &config.routing_target())?;
        Ok(())
    }
}
