//! Document and object store boundaries.
//!
//! The sync layer only talks to these traits. Backends:
//!
//! | Boundary | Backends |
//! |---|---|
//! | [`DocumentStore`] | [`MemoryDocumentStore`], [`SnapshotDocumentStore`], [`LibSqlDocumentStore`] |
//! | [`ObjectStore`] | [`MemoryObjectStore`], [`FsObjectStore`], [`R2ObjectStore`] |

mod fs;
mod memory;
mod migrations;
mod r2;
mod snapshot;
mod sqlite;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::util::sanitize_file_name;
use crate::{Error, Result};

pub use self::fs::FsObjectStore;
pub use self::memory::{MemoryDocumentStore, MemoryObjectStore};
pub use self::r2::{R2Config, R2ObjectStore};
pub use self::snapshot::SnapshotDocumentStore;
pub use self::sqlite::{Database, LibSqlDocumentStore, ReplicaConfig};

/// Server-maintained creation timestamp field, usable as an order field.
pub const CREATED_AT: &str = "created_at";

/// Schemaless document body.
pub type Fields = serde_json::Map<String, Value>;

/// Sort direction for ordered listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A stored document with its store-assigned metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier, unique within the collection
    pub id: String,
    /// Store-assigned creation timestamp (Unix ms)
    pub created_at: i64,
    /// Document body
    pub fields: Fields,
}

impl Document {
    /// Decode the document body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

/// Identity of a freshly inserted document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub created_at: i64,
}

/// Hosted document database, grouped into named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every document of a collection ordered by a field.
    ///
    /// [`CREATED_AT`] orders by the store-assigned timestamp; any other name
    /// orders by that body field. Ties keep insertion order.
    async fn list_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>>;

    /// Insert a new document; the store assigns its id and creation time.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentRef>;

    /// Overwrite the given top-level fields of an existing document.
    ///
    /// Fails with [`Error::NotFound`] when the document does not exist.
    async fn replace_fields(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Remove a document.
    ///
    /// Fails with [`Error::NotFound`] when the document does not exist.
    async fn remove(&self, collection: &str, id: &str) -> Result<()>;
}

/// Hosted binary blob storage addressed by string keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a key, replacing any previous object.
    async fn upload(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<()>;

    /// Resolve a retrieval URL for a stored object.
    async fn resolve_url(&self, key: &str) -> Result<String>;

    /// Remove an object. Fails with [`Error::NotFound`] when it is absent.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Serialize a typed record into a document body.
pub fn encode_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Validation(format!(
            "document body must be an object, got {other}"
        ))),
    }
}

/// Build a fresh, collision-free object key for an uploaded image.
pub fn build_image_key(file_name: &str) -> String {
    let ts = Utc::now().timestamp_millis();
    let id = Uuid::now_v7();
    let name = sanitize_file_name(file_name);
    format!("images/{ts}-{id}-{name}")
}

pub(crate) fn new_document_id() -> String {
    Uuid::now_v7().simple().to_string()
}

pub(crate) fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(Error::Validation("object key cannot be empty".to_string()));
    }
    if object_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::Validation(format!(
            "object key has an invalid path segment: {object_key}"
        )));
    }
    Ok(object_key)
}

pub(crate) fn normalize_collection(collection: &str) -> Result<&str> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(collection)
    } else {
        Err(Error::Validation(format!(
            "invalid collection name: {collection:?}"
        )))
    }
}

/// Order two documents by a field, `created_at` meaning the store timestamp.
pub(crate) fn compare_documents(left: &Document, right: &Document, field: &str) -> Ordering {
    if field == CREATED_AT {
        return left.created_at.cmp(&right.created_at);
    }
    compare_values(left.fields.get(field), right.fields.get(field))
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}
