//! In-memory implementation of QueryBackend
//!
//! Records are kept as JSON objects per repository in a
//! `tokio::sync::RwLock<HashMap<..>>`. Useful for tests, demos and small
//! embedded deployments; it supports equality filters, ordering, paging,
//! soft deletes and every bulk import mode.

use super::models::*;
use super::traits::{Entity, QueryBackend};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredRow {
    fields: Map<String, Value>,
    deleted_at: Option<String>,
}

impl StoredRow {
    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Default)]
struct Collection {
    rows: Vec<StoredRow>,
    next_id: i64,
}

/// In-memory backend for any [`Entity`]
pub struct MemoryBackend<T: Entity> {
    collections: RwLock<HashMap<String, Collection>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for MemoryBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryBackend<T> {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            _entity: PhantomData,
        }
    }

    /// Undo a soft delete, returning the restored record
    pub async fn restore(&self, repository: &RepositoryHandle, id: &EntityKey) -> Result<Option<T>> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(repository.name()) else {
            return Ok(None);
        };
        match collection
            .rows
            .iter_mut()
            .find(|row| !row.is_live() && key_matches::<T>(&row.fields, id))
        {
            Some(row) => {
                row.deleted_at = None;
                to_entity::<T>(&row.fields).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Rows matching the filter, ordered and paged
    async fn select(
        &self,
        repository: &RepositoryHandle,
        options: &FindOptions,
        paged: bool,
    ) -> Vec<Map<String, Value>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(repository.name()) else {
            return Vec::new();
        };

        let mut rows: Vec<Map<String, Value>> = collection
            .rows
            .iter()
            .filter(|row| options.with_deleted || row.is_live())
            .filter(|row| matches_filter(&row.fields, &options.filter))
            .map(|row| row.fields.clone())
            .collect();

        if !options.order.is_empty() {
            rows.sort_by(|a, b| {
                for order in &options.order {
                    let ord = compare_values(a.get(&order.field), b.get(&order.field));
                    let ord = match order.order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if !paged {
            return rows;
        }
        rows.into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.take.unwrap_or(usize::MAX))
            .collect()
    }

    async fn metric_values(
        &self,
        repository: &RepositoryHandle,
        metric: &str,
        options: &FindOptions,
    ) -> Vec<f64> {
        self.select(repository, options, false)
            .await
            .iter()
            .filter_map(|row| row.get(metric).and_then(Value::as_f64))
            .collect()
    }
}

fn patch_fields<P: serde::Serialize>(patch: &P) -> Result<Map<String, Value>> {
    match serde_json::to_value(patch).context("failed to serialize patch")? {
        Value::Object(fields) => Ok(fields),
        other => bail!("patch must serialize to an object, got {}", other),
    }
}

fn to_entity<T: Entity>(fields: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(fields.clone()))
        .context("stored record does not match the entity shape")
}

fn key_of<T: Entity>(fields: &Map<String, Value>) -> Option<EntityKey> {
    fields.get(T::KEY_FIELD).and_then(EntityKey::from_value)
}

fn key_matches<T: Entity>(fields: &Map<String, Value>, id: &EntityKey) -> bool {
    key_of::<T>(fields).as_ref() == Some(id)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn matches_filter(fields: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(field, expected)| {
        let actual = fields.get(field).unwrap_or(&Value::Null);
        values_equal(actual, expected)
    })
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

impl Collection {
    /// Insert a row, assigning an integer key when the patch carries none
    ///
    /// The id counter only advances once the row is accepted.
    fn insert<T: Entity>(&mut self, mut fields: Map<String, Value>) -> Result<T> {
        let next_id = match key_of::<T>(&fields) {
            Some(key) => {
                if self.rows.iter().any(|row| key_matches::<T>(&row.fields, &key)) {
                    bail!("duplicate key {}", key);
                }
                match key {
                    EntityKey::Int(n) => self.next_id.max(n),
                    EntityKey::Str(_) => self.next_id,
                }
            }
            None => {
                let id = self
                    .next_id
                    .checked_add(1)
                    .ok_or_else(|| anyhow!("id space exhausted"))?;
                fields.insert(T::KEY_FIELD.to_string(), Value::from(id));
                id
            }
        };

        let entity = to_entity::<T>(&fields)?;
        self.next_id = next_id;
        self.rows.push(StoredRow {
            fields,
            deleted_at: None,
        });
        Ok(entity)
    }

    /// Merge an upsert row over the live row at `index`
    ///
    /// The stored key is kept; a row naming a different key is rejected.
    fn upsert<T: Entity>(&mut self, index: usize, mut patch: Map<String, Value>) -> Result<T> {
        if let Some(incoming) = key_of::<T>(&patch) {
            let existing = key_of::<T>(&self.rows[index].fields);
            if existing.as_ref() != Some(&incoming) {
                bail!(
                    "row key {} conflicts with matched record {}",
                    incoming,
                    existing.map(|k| k.to_string()).unwrap_or_default()
                );
            }
        }
        patch.remove(T::KEY_FIELD);
        self.merge::<T>(index, patch)
    }

    /// Merge `patch` over the live row at `index`
    fn merge<T: Entity>(&mut self, index: usize, patch: Map<String, Value>) -> Result<T> {
        let mut merged = self.rows[index].fields.clone();
        for (field, value) in patch {
            merged.insert(field, value);
        }
        let entity = to_entity::<T>(&merged)?;
        self.rows[index].fields = merged;
        Ok(entity)
    }

    fn position_live_key<T: Entity>(&self, key: &EntityKey) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.is_live() && key_matches::<T>(&row.fields, key))
    }

    fn position_live_field(&self, field: &str, value: &Value) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.is_live()
                && row
                    .fields
                    .get(field)
                    .is_some_and(|existing| values_equal(existing, value))
        })
    }
}

#[async_trait]
impl<T: Entity> QueryBackend<T> for MemoryBackend<T> {
    async fn create(
        &self,
        repository: &RepositoryHandle,
        data: T::Patch,
        relations: &[String],
    ) -> Result<T> {
        let fields = patch_fields(&data)?;
        if !relations.is_empty() {
            debug!(repository = %repository, ?relations, "Relations are not stored in memory, ignoring");
        }

        let mut collections = self.collections.write().await;
        let collection = collections.entry(repository.name().to_string()).or_default();
        collection.insert::<T>(fields)
    }

    async fn bulk(
        &self,
        repository: &RepositoryHandle,
        data: Vec<T::Patch>,
        mode: ImportMode,
        dedup_field: Option<&str>,
    ) -> Result<BulkUploadResponse> {
        if matches!(mode, ImportMode::Upsert | ImportMode::Delete) && dedup_field.is_none() {
            bail!("{:?} import requires a dedup field", mode);
        }

        let mut response = BulkUploadResponse {
            total: data.len(),
            ..Default::default()
        };

        let mut collections = self.collections.write().await;
        let collection = collections.entry(repository.name().to_string()).or_default();

        if mode == ImportMode::Repopulate {
            response.deleted = collection.rows.len();
            collection.rows.clear();
        }

        for patch in &data {
            let fields = match patch_fields(patch) {
                Ok(fields) => fields,
                Err(e) => {
                    debug!(repository = %repository, "Bulk row rejected: {}", e);
                    response.errored += 1;
                    continue;
                }
            };

            let existing = dedup_field.and_then(|field| {
                fields
                    .get(field)
                    .and_then(|value| collection.position_live_field(field, value))
            });

            let outcome = match (mode, existing) {
                (ImportMode::Create, Some(_)) => {
                    response.duplicates += 1;
                    Ok(None)
                }
                (ImportMode::Create | ImportMode::Repopulate, None) => {
                    collection.insert::<T>(fields).map(|entity| {
                        response.created += 1;
                        entity.key()
                    })
                }
                (ImportMode::Repopulate, Some(_)) => {
                    response.duplicates += 1;
                    Ok(None)
                }
                (ImportMode::Upsert, Some(index)) => {
                    collection.upsert::<T>(index, fields).map(|entity| {
                        response.updated += 1;
                        entity.key()
                    })
                }
                (ImportMode::Upsert, None) => collection.insert::<T>(fields).map(|entity| {
                    response.created += 1;
                    entity.key()
                }),
                (ImportMode::Delete, Some(index)) => {
                    let row = collection.rows.remove(index);
                    response.deleted += 1;
                    Ok(key_of::<T>(&row.fields))
                }
                (ImportMode::Delete, None) => Ok(None),
            };

            match outcome {
                Ok(key) => {
                    response.processed += 1;
                    response.ids.extend(key);
                }
                Err(e) => {
                    debug!(repository = %repository, "Bulk row failed: {}", e);
                    response.errored += 1;
                }
            }
        }

        debug!(
            repository = %repository,
            mode = ?mode,
            total = response.total,
            created = response.created,
            updated = response.updated,
            deleted = response.deleted,
            errored = response.errored,
            "Bulk import finished"
        );
        Ok(response)
    }

    async fn find_all(&self, repository: &RepositoryHandle, options: &FindOptions) -> Result<Vec<T>> {
        self.select(repository, options, true)
            .await
            .iter()
            .map(to_entity::<T>)
            .collect()
    }

    async fn find_one(
        &self,
        repository: &RepositoryHandle,
        options: &FindOptions,
    ) -> Result<Option<T>> {
        self.select(repository, options, true)
            .await
            .first()
            .map(to_entity::<T>)
            .transpose()
    }

    async fn find_one_by_id(
        &self,
        repository: &RepositoryHandle,
        id: &EntityKey,
        _relations: &[String],
    ) -> Result<Option<T>> {
        let collections = self.collections.read().await;
        collections
            .get(repository.name())
            .and_then(|collection| {
                collection
                    .rows
                    .iter()
                    .find(|row| row.is_live() && key_matches::<T>(&row.fields, id))
            })
            .map(|row| to_entity::<T>(&row.fields))
            .transpose()
    }

    async fn count(&self, repository: &RepositoryHandle, options: &FindOptions) -> Result<u64> {
        Ok(self.select(repository, options, false).await.len() as u64)
    }

    async fn sum(
        &self,
        repository: &RepositoryHandle,
        metric: &str,
        options: &FindOptions,
    ) -> Result<f64> {
        Ok(self
            .metric_values(repository, metric, options)
            .await
            .iter()
            .sum())
    }

    async fn avg(
        &self,
        repository: &RepositoryHandle,
        metric: &str,
        options: &FindOptions,
    ) -> Result<f64> {
        let values = self.metric_values(repository, metric, options).await;
        if values.is_empty() {
            return Ok(0.0);
        }
        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }

    async fn update(
        &self,
        repository: &RepositoryHandle,
        data: T::Patch,
        _relations: &[String],
    ) -> Result<T> {
        let fields = patch_fields(&data)?;
        let key = key_of::<T>(&fields)
            .ok_or_else(|| anyhow!("update requires the '{}' field", T::KEY_FIELD))?;

        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(repository.name())
            .ok_or_else(|| anyhow!("record {} not found in {}", key, repository))?;
        let index = collection
            .position_live_key::<T>(&key)
            .ok_or_else(|| anyhow!("record {} not found in {}", key, repository))?;
        collection.merge::<T>(index, fields)
    }

    async fn remove(&self, repository: &RepositoryHandle, record: T) -> Result<T> {
        let key = record
            .key()
            .ok_or_else(|| anyhow!("cannot remove a record without a key"))?;

        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(repository.name())
            .ok_or_else(|| anyhow!("record {} not found in {}", key, repository))?;
        let index = collection
            .position_live_key::<T>(&key)
            .ok_or_else(|| anyhow!("record {} not found in {}", key, repository))?;

        let row = &mut collection.rows[index];
        row.deleted_at = Some(chrono::Utc::now().to_rfc3339());
        to_entity::<T>(&row.fields)
    }

    async fn purge(&self, repository: &RepositoryHandle, record: &T) -> Result<()> {
        let key = record
            .key()
            .ok_or_else(|| anyhow!("cannot purge a record without a key"))?;

        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(repository.name()) {
            let before = collection.rows.len();
            collection
                .rows
                .retain(|row| !key_matches::<T>(&row.fields, &key));
            if collection.rows.len() == before {
                debug!(repository = %repository, key = %key, "Purge found no record");
            }
        }
        Ok(())
    }

    async fn raw(&self, repository: &RepositoryHandle, query: &str) -> Result<Value> {
        debug!(repository = %repository, query = %query, "Rejecting raw query");
        bail!("raw queries are not supported by the in-memory backend")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{widget, Widget, WidgetPatch};

    fn repo() -> RepositoryHandle {
        RepositoryHandle::new("widgets")
    }

    async fn seeded() -> MemoryBackend<Widget> {
        let backend = MemoryBackend::new();
        for (name, quantity) in [("alpha", 3), ("beta", 1), ("gamma", 2)] {
            backend
                .create(&repo(), WidgetPatch::named(name).quantity(quantity), &[])
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn test_create_assigns_incrementing_ids() {
        let backend = MemoryBackend::<Widget>::new();
        let a = backend.create(&repo(), WidgetPatch::named("a"), &[]).await.unwrap();
        let b = backend.create(&repo(), WidgetPatch::named("b"), &[]).await.unwrap();
        assert_eq!(a, widget(1, "a"));
        assert_eq!(b, widget(2, "b"));
    }

    #[tokio::test]
    async fn test_create_with_explicit_id_and_duplicate() {
        let backend = MemoryBackend::<Widget>::new();
        let patch = WidgetPatch {
            id: Some(10),
            name: Some("x".into()),
            quantity: None,
        };
        backend.create(&repo(), patch.clone(), &[]).await.unwrap();
        assert!(backend.create(&repo(), patch, &[]).await.is_err());

        let next = backend.create(&repo(), WidgetPatch::named("y"), &[]).await.unwrap();
        assert_eq!(next.id, 11);
    }

    #[tokio::test]
    async fn test_create_rejects_incomplete_record() {
        let backend = MemoryBackend::<Widget>::new();
        // `name` is required by the entity shape
        let err = backend
            .create(&repo(), WidgetPatch::default(), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("entity shape"));
    }

    #[tokio::test]
    async fn test_find_filter_order_page() {
        let backend = seeded().await;

        let sorted = backend
            .find_all(&repo(), &FindOptions::new().order_by("quantity", SortOrder::Desc))
            .await
            .unwrap();
        let names: Vec<_> = sorted.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "gamma", "beta"]);

        let page = backend
            .find_all(
                &repo(),
                &FindOptions::new()
                    .order_by("name", SortOrder::Asc)
                    .skip(1)
                    .take(1),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "beta");

        let found = backend
            .find_one(&repo(), &FindOptions::new().where_eq("name", "gamma"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.quantity, 2);

        assert!(backend
            .find_one(&repo(), &FindOptions::new().where_eq("name", "zeta"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_repository_is_empty() {
        let backend = MemoryBackend::<Widget>::new();
        let other = RepositoryHandle::new("other");
        assert!(backend.find_all(&other, &FindOptions::new()).await.unwrap().is_empty());
        assert_eq!(backend.count(&other, &FindOptions::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_aggregates() {
        let backend = seeded().await;
        let all = FindOptions::new();
        assert_eq!(backend.count(&repo(), &all).await.unwrap(), 3);
        assert_eq!(backend.sum(&repo(), "quantity", &all).await.unwrap(), 6.0);
        assert_eq!(backend.avg(&repo(), "quantity", &all).await.unwrap(), 2.0);

        let none = FindOptions::new().where_eq("name", "zeta");
        assert_eq!(backend.avg(&repo(), "quantity", &none).await.unwrap(), 0.0);
        // count ignores paging
        assert_eq!(
            backend.count(&repo(), &FindOptions::new().take(1)).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let backend = seeded().await;
        let updated = backend
            .update(&repo(), WidgetPatch::with_id(2).quantity(9), &[])
            .await
            .unwrap();
        assert_eq!(updated.name, "beta");
        assert_eq!(updated.quantity, 9);

        assert!(backend
            .update(&repo(), WidgetPatch::named("no-id"), &[])
            .await
            .is_err());
        assert!(backend
            .update(&repo(), WidgetPatch::with_id(99), &[])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_remove_is_soft_and_restorable() {
        let backend = seeded().await;
        let alpha = backend
            .find_one_by_id(&repo(), &EntityKey::Int(1), &[])
            .await
            .unwrap()
            .unwrap();

        let removed = backend.remove(&repo(), alpha).await.unwrap();
        assert_eq!(removed.name, "alpha");
        assert!(backend
            .find_one_by_id(&repo(), &EntityKey::Int(1), &[])
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            backend
                .find_all(&repo(), &FindOptions::new().with_deleted())
                .await
                .unwrap()
                .len(),
            3
        );

        let restored = backend.restore(&repo(), &EntityKey::Int(1)).await.unwrap();
        assert_eq!(restored.map(|w| w.name), Some("alpha".to_string()));
        assert_eq!(backend.count(&repo(), &FindOptions::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_purge_is_permanent_and_idempotent() {
        let backend = seeded().await;
        let beta = widget(2, "beta");
        backend.purge(&repo(), &beta).await.unwrap();
        backend.purge(&repo(), &beta).await.unwrap();

        assert_eq!(
            backend
                .find_all(&repo(), &FindOptions::new().with_deleted())
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(backend.restore(&repo(), &EntityKey::Int(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bulk_create_skips_duplicates() {
        let backend = seeded().await;
        let response = backend
            .bulk(
                &repo(),
                vec![WidgetPatch::named("alpha"), WidgetPatch::named("delta")],
                ImportMode::Create,
                Some("name"),
            )
            .await
            .unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.processed, 2);
        assert_eq!(response.created, 1);
        assert_eq!(response.duplicates, 1);
        assert_eq!(response.ids, vec![EntityKey::Int(4)]);
    }

    #[tokio::test]
    async fn test_bulk_upsert_and_delete() {
        let backend = seeded().await;
        let response = backend
            .bulk(
                &repo(),
                vec![
                    WidgetPatch::named("alpha").quantity(30),
                    WidgetPatch::named("omega").quantity(1),
                ],
                ImportMode::Upsert,
                Some("name"),
            )
            .await
            .unwrap();
        assert_eq!(response.updated, 1);
        assert_eq!(response.created, 1);
        assert_eq!(
            backend
                .find_one(&repo(), &FindOptions::new().where_eq("name", "alpha"))
                .await
                .unwrap()
                .unwrap()
                .quantity,
            30
        );

        let response = backend
            .bulk(
                &repo(),
                vec![WidgetPatch::named("beta"), WidgetPatch::named("missing")],
                ImportMode::Delete,
                Some("name"),
            )
            .await
            .unwrap();
        assert_eq!(response.deleted, 1);
        assert_eq!(response.processed, 2);
        assert_eq!(backend.count(&repo(), &FindOptions::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_keeps_stored_key() {
        let backend = seeded().await;

        // Matches "beta" (id 2) by name but names id 1
        let conflicting = WidgetPatch {
            id: Some(1),
            name: Some("beta".into()),
            quantity: Some(5),
        };
        // Matches "gamma" (id 3) and repeats its own key
        let same_key = WidgetPatch {
            id: Some(3),
            name: Some("gamma".into()),
            quantity: Some(7),
        };
        let response = backend
            .bulk(
                &repo(),
                vec![conflicting, same_key],
                ImportMode::Upsert,
                Some("name"),
            )
            .await
            .unwrap();
        assert_eq!(response.errored, 1);
        assert_eq!(response.updated, 1);
        assert_eq!(response.ids, vec![EntityKey::Int(3)]);

        let all = backend
            .find_all(&repo(), &FindOptions::new().order_by("id", SortOrder::Asc))
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(all[0].name, "alpha");
        assert_eq!(all[1].quantity, 1);
        assert_eq!(all[2].quantity, 7);
    }

    #[tokio::test]
    async fn test_upsert_without_key_updates_matched_row() {
        let backend = seeded().await;
        let response = backend
            .bulk(
                &repo(),
                vec![WidgetPatch::named("beta").quantity(4)],
                ImportMode::Upsert,
                Some("name"),
            )
            .await
            .unwrap();
        assert_eq!(response.updated, 1);
        assert_eq!(response.ids, vec![EntityKey::Int(2)]);
    }

    #[tokio::test]
    async fn test_exhausted_id_space_is_an_error() {
        let backend = MemoryBackend::<Widget>::new();
        let last = WidgetPatch {
            id: Some(i64::MAX),
            name: Some("last".into()),
            quantity: None,
        };
        backend.create(&repo(), last, &[]).await.unwrap();

        let err = backend
            .create(&repo(), WidgetPatch::named("next"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("id space exhausted"));

        // The lock was released and the store is intact
        assert_eq!(backend.count(&repo(), &FindOptions::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_explicit_id_does_not_advance_counter() {
        let backend = MemoryBackend::<Widget>::new();
        // Missing `name`: rejected after the key check
        let invalid = WidgetPatch {
            id: Some(50),
            name: None,
            quantity: None,
        };
        assert!(backend.create(&repo(), invalid, &[]).await.is_err());

        let next = backend
            .create(&repo(), WidgetPatch::named("first"), &[])
            .await
            .unwrap();
        assert_eq!(next.id, 1);
    }

    #[tokio::test]
    async fn test_bulk_requires_dedup_field_for_upsert() {
        let backend = MemoryBackend::<Widget>::new();
        assert!(backend
            .bulk(&repo(), vec![], ImportMode::Upsert, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_bulk_repopulate_replaces_rows() {
        let backend = seeded().await;
        let response = backend
            .bulk(
                &repo(),
                vec![WidgetPatch::named("solo"), WidgetPatch::default()],
                ImportMode::Repopulate,
                None,
            )
            .await
            .unwrap();
        assert_eq!(response.deleted, 3);
        assert_eq!(response.created, 1);
        assert_eq!(response.errored, 1);

        let all = backend.find_all(&repo(), &FindOptions::new()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "solo");
    }

    #[tokio::test]
    async fn test_raw_is_unsupported() {
        let backend = MemoryBackend::<Widget>::new();
        assert!(backend.raw(&repo(), "select 1").await.is_err());
    }
}
