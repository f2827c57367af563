//! Recording mock implementation of QueryBackend for testing.
//!
//! Returns canned results and records every call, so tests can assert exactly
//! what an `EntityService` forwarded. Conditionally compiled with `#[cfg(test)]`.

use super::models::*;
use super::traits::{Entity, QueryBackend};
use crate::test_helpers::{Widget, WidgetPatch};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A call received by the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Create(Value, Vec<String>),
    Bulk(usize, ImportMode, Option<String>),
    FindAll,
    FindOne,
    FindOneById(EntityKey, Vec<String>),
    Count,
    Sum(String),
    Avg(String),
    Update(Value, Vec<String>),
    Remove(EntityKey),
    Purge(EntityKey),
    Raw(String),
}

/// Mock QueryBackend over `Widget` records
#[derive(Default)]
pub struct MockQueryBackend {
    calls: Mutex<Vec<BackendCall>>,
    create_results: Mutex<VecDeque<Widget>>,
    update_result: Mutex<Option<Widget>>,
    bulk_response: Mutex<BulkUploadResponse>,
    records: Mutex<Vec<Widget>>,
}

impl MockQueryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `create` call
    pub fn push_create(&self, widget: Widget) {
        self.create_results.lock().unwrap().push_back(widget);
    }

    pub fn set_update_result(&self, widget: Widget) {
        *self.update_result.lock().unwrap() = Some(widget);
    }

    pub fn set_bulk_response(&self, response: BulkUploadResponse) {
        *self.bulk_response.lock().unwrap() = response;
    }

    /// Records served by the find operations
    pub fn set_records(&self, records: Vec<Widget>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn key_of(widget: &Widget) -> EntityKey {
    widget.key().unwrap_or(EntityKey::Int(0))
}

#[async_trait]
impl QueryBackend<Widget> for MockQueryBackend {
    async fn create(
        &self,
        _repository: &RepositoryHandle,
        data: WidgetPatch,
        relations: &[String],
    ) -> Result<Widget> {
        self.record(BackendCall::Create(
            serde_json::to_value(&data)?,
            relations.to_vec(),
        ));
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("no create result queued"))
    }

    async fn bulk(
        &self,
        _repository: &RepositoryHandle,
        data: Vec<WidgetPatch>,
        mode: ImportMode,
        dedup_field: Option<&str>,
    ) -> Result<BulkUploadResponse> {
        self.record(BackendCall::Bulk(
            data.len(),
            mode,
            dedup_field.map(str::to_string),
        ));
        Ok(self.bulk_response.lock().unwrap().clone())
    }

    async fn find_all(
        &self,
        _repository: &RepositoryHandle,
        _options: &FindOptions,
    ) -> Result<Vec<Widget>> {
        self.record(BackendCall::FindAll);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn find_one(
        &self,
        _repository: &RepositoryHandle,
        _options: &FindOptions,
    ) -> Result<Option<Widget>> {
        self.record(BackendCall::FindOne);
        Ok(self.records.lock().unwrap().first().cloned())
    }

    async fn find_one_by_id(
        &self,
        _repository: &RepositoryHandle,
        id: &EntityKey,
        relations: &[String],
    ) -> Result<Option<Widget>> {
        self.record(BackendCall::FindOneById(id.clone(), relations.to_vec()));
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|w| &key_of(w) == id)
            .cloned())
    }

    async fn count(&self, _repository: &RepositoryHandle, _options: &FindOptions) -> Result<u64> {
        self.record(BackendCall::Count);
        Ok(10)
    }

    async fn sum(
        &self,
        _repository: &RepositoryHandle,
        metric: &str,
        _options: &FindOptions,
    ) -> Result<f64> {
        self.record(BackendCall::Sum(metric.to_string()));
        Ok(42.0)
    }

    async fn avg(
        &self,
        _repository: &RepositoryHandle,
        metric: &str,
        _options: &FindOptions,
    ) -> Result<f64> {
        self.record(BackendCall::Avg(metric.to_string()));
        Ok(3.5)
    }

    async fn update(
        &self,
        _repository: &RepositoryHandle,
        data: WidgetPatch,
        relations: &[String],
    ) -> Result<Widget> {
        self.record(BackendCall::Update(
            serde_json::to_value(&data)?,
            relations.to_vec(),
        ));
        self.update_result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no update result set"))
    }

    async fn remove(&self, _repository: &RepositoryHandle, record: Widget) -> Result<Widget> {
        self.record(BackendCall::Remove(key_of(&record)));
        Ok(record)
    }

    async fn purge(&self, _repository: &RepositoryHandle, record: &Widget) -> Result<()> {
        self.record(BackendCall::Purge(key_of(record)));
        Ok(())
    }

    async fn raw(&self, _repository: &RepositoryHandle, query: &str) -> Result<Value> {
        self.record(BackendCall::Raw(query.to_string()));
        Ok(json!([{"ok": true}]))
    }
}
