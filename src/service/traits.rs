//! Entity and QueryBackend trait definitions
//!
//! `QueryBackend` is the abstract interface every persistence layer plugs in
//! behind an `EntityService`, enabling testing with mock implementations and
//! backend swaps without touching service code.

use super::models::*;
use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type an `EntityService` can manage
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Partial form accepted by create and update
    type Patch: Serialize + Clone + Send + Sync + 'static;

    /// Name of the identity field in the serialized form
    const KEY_FIELD: &'static str = "id";

    /// Identity of this record, if it has been assigned one
    fn key(&self) -> Option<EntityKey>;
}

/// Abstract interface for all data operations behind an entity service.
///
/// Every call receives the repository handle the service was built with.
#[async_trait]
pub trait QueryBackend<T: Entity>: Send + Sync {
    /// Create one record
    async fn create(
        &self,
        repository: &RepositoryHandle,
        data: T::Patch,
        relations: &[String],
    ) -> Result<T>;

    /// Bulk insert, upsert or delete records
    async fn bulk(
        &self,
        repository: &RepositoryHandle,
        data: Vec<T::Patch>,
        mode: ImportMode,
        dedup_field: Option<&str>,
    ) -> Result<BulkUploadResponse>;

    /// Find all records matching the options
    async fn find_all(&self, repository: &RepositoryHandle, options: &FindOptions)
        -> Result<Vec<T>>;

    /// Find the first record matching the options
    async fn find_one(
        &self,
        repository: &RepositoryHandle,
        options: &FindOptions,
    ) -> Result<Option<T>>;

    /// Find a record by its key
    async fn find_one_by_id(
        &self,
        repository: &RepositoryHandle,
        id: &EntityKey,
        relations: &[String],
    ) -> Result<Option<T>>;

    /// Count records matching the options
    async fn count(&self, repository: &RepositoryHandle, options: &FindOptions) -> Result<u64>;

    /// Sum a numeric field over matching records
    async fn sum(
        &self,
        repository: &RepositoryHandle,
        metric: &str,
        options: &FindOptions,
    ) -> Result<f64>;

    /// Average a numeric field over matching records
    async fn avg(
        &self,
        repository: &RepositoryHandle,
        metric: &str,
        options: &FindOptions,
    ) -> Result<f64>;

    /// Update a record; the patch carries the key
    async fn update(
        &self,
        repository: &RepositoryHandle,
        data: T::Patch,
        relations: &[String],
    ) -> Result<T>;

    /// Soft delete, can be restored
    async fn remove(&self, repository: &RepositoryHandle, record: T) -> Result<T>;

    /// Permanent delete
    async fn purge(&self, repository: &RepositoryHandle, record: &T) -> Result<()>;

    /// Run a backend-native query
    async fn raw(&self, repository: &RepositoryHandle, query: &str) -> Result<serde_json::Value>;
}
