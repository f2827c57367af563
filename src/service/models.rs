//! Query option and result models passed between services and backends

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of a stored record
///
/// Mirrors the two key shapes stores hand out: auto-increment integers and
/// string ids (UUIDs, slugs, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityKey {
    Int(i64),
    Str(String),
}

impl EntityKey {
    /// `0` and the empty string are not usable ids
    pub fn is_blank(&self) -> bool {
        match self {
            EntityKey::Int(n) => *n == 0,
            EntityKey::Str(s) => s.is_empty(),
        }
    }

    /// Read a key out of a JSON value (integers and strings only)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(EntityKey::Int),
            Value::String(s) => Some(EntityKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityKey::Int(n) => Value::from(*n),
            EntityKey::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Int(n) => write!(f, "{n}"),
            EntityKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        EntityKey::Int(value)
    }
}

impl From<i32> for EntityKey {
    fn from(value: i32) -> Self {
        EntityKey::Int(value.into())
    }
}

impl From<u32> for EntityKey {
    fn from(value: u32) -> Self {
        EntityKey::Int(value.into())
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        EntityKey::Str(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        EntityKey::Str(value)
    }
}

/// Handle on the collection a service operates on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryHandle {
    name: String,
}

impl RepositoryHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Sort direction for [`OrderBy`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// Filtering, ordering and paging for read operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    /// Field equality filters
    #[serde(rename = "where")]
    pub filter: Map<String, Value>,
    pub order: Vec<OrderBy>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    /// Relations to load alongside each record
    pub relations: Vec<String>,
    /// Include soft-deleted records
    pub with_deleted: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order.push(OrderBy {
            field: field.into(),
            order,
        });
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    pub fn with_relations(mut self, relations: Vec<String>) -> Self {
        self.relations = relations;
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }
}

/// How a bulk import treats incoming rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportMode {
    /// Insert every row; rows colliding on the dedup field are skipped
    Create,
    /// Update rows matching on the dedup field, insert the rest
    Upsert,
    /// Delete rows matching on the dedup field
    Delete,
    /// Wipe the collection, then insert every row
    Repopulate,
}

/// Summary returned by a bulk import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUploadResponse {
    pub total: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub duplicates: usize,
    pub errored: usize,
    /// Keys of the records touched by the import
    pub ids: Vec<EntityKey>,
}
