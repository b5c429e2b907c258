//! In-process store backends.
//!
//! Used directly by tests and as the state engine behind the snapshot store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{
    compare_documents, new_document_id, normalize_collection, normalize_object_key, Direction,
    Document, DocumentRef, DocumentStore, Fields, ObjectStore,
};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// All collections plus the insertion counter used for stable ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Collections {
    #[serde(default)]
    next_seq: u64,
    #[serde(default)]
    collections: BTreeMap<String, Vec<StoredDocument>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredDocument {
    seq: u64,
    #[serde(flatten)]
    document: Document,
}

impl Collections {
    pub(crate) fn list(
        &self,
        collection: &str,
        field: &str,
        direction: Direction,
    ) -> Vec<Document> {
        let Some(stored) = self.collections.get(collection) else {
            return Vec::new();
        };

        let mut ordered = stored.iter().collect::<Vec<_>>();
        ordered.sort_by(|left, right| {
            compare_documents(&left.document, &right.document, field)
                .then(left.seq.cmp(&right.seq))
        });
        if direction == Direction::Descending {
            ordered.reverse();
        }

        ordered
            .into_iter()
            .map(|stored| stored.document.clone())
            .collect()
    }

    pub(crate) fn insert(&mut self, collection: &str, fields: Fields) -> DocumentRef {
        let reference = DocumentRef {
            id: new_document_id(),
            created_at: unix_millis_now(),
        };
        self.next_seq += 1;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(StoredDocument {
                seq: self.next_seq,
                document: Document {
                    id: reference.id.clone(),
                    created_at: reference.created_at,
                    fields,
                },
            });
        reference
    }

    pub(crate) fn replace_fields(
        &mut self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<()> {
        let stored = self
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|stored| stored.document.id == id))
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;

        for (key, value) in fields {
            stored.document.fields.insert(key, value);
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, collection: &str, id: &str) -> Result<()> {
        let documents = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;
        let before = documents.len();
        documents.retain(|stored| stored.document.id != id);
        if documents.len() == before {
            return Err(Error::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }
}

/// Counts down injected failures; zero means calls pass through.
#[derive(Debug, Default)]
struct FailureBudget(AtomicU32);

impl FailureBudget {
    fn arm(&self, count: u32) {
        self.0.store(count, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

/// Document store held entirely in memory.
///
/// Failure injection hooks let callers exercise remote-failure paths.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: Mutex<Collections>,
    failing_lists: FailureBudget,
    failing_writes: FailureBudget,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` list calls fail with a transient error.
    pub fn fail_next_lists(&self, count: u32) {
        self.failing_lists.arm(count);
    }

    /// Make the next `count` insert/replace/remove calls fail with a transient error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.arm(count);
    }

    /// Number of documents currently stored in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.state
            .lock()
            .await
            .list(collection, super::CREATED_AT, Direction::Ascending)
            .len()
    }

    fn injected(budget: &FailureBudget, operation: &str) -> Result<()> {
        if budget.take() {
            Err(Error::Database(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let collection = normalize_collection(collection)?;
        Self::injected(&self.failing_lists, "list")?;
        Ok(self.state.lock().await.list(collection, order_field, direction))
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentRef> {
        let collection = normalize_collection(collection)?;
        Self::injected(&self.failing_writes, "insert")?;
        Ok(self.state.lock().await.insert(collection, fields))
    }

    async fn replace_fields(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let collection = normalize_collection(collection)?;
        Self::injected(&self.failing_writes, "update")?;
        self.state.lock().await.replace_fields(collection, id, fields)
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let collection = normalize_collection(collection)?;
        Self::injected(&self.failing_writes, "delete")?;
        self.state.lock().await.remove(collection, id)
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// Object store held entirely in memory; URLs use the `memory://` scheme.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_uploads: FailureBudget,
    failing_removals: FailureBudget,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` uploads fail with a transient error.
    pub fn fail_next_uploads(&self, count: u32) {
        self.failing_uploads.arm(count);
    }

    /// Make the next `count` removals fail with a transient error.
    pub fn fail_next_removals(&self, count: u32) {
        self.failing_removals.arm(count);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    /// Stored bytes and content type for a key.
    pub async fn get(&self, key: &str) -> Option<(Vec<u8>, Option<String>)> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|object| (object.bytes.clone(), object.content_type.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<()> {
        let key = normalize_object_key(key)?;
        if self.failing_uploads.take() {
            return Err(Error::Storage(format!("injected upload failure for {key}")));
        }
        self.objects.lock().await.insert(
            key,
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.map(ToOwned::to_owned),
            },
        );
        Ok(())
    }

    async fn resolve_url(&self, key: &str) -> Result<String> {
        let key = normalize_object_key(key)?;
        if self.objects.lock().await.contains_key(&key) {
            Ok(format!("memory://{key}"))
        } else {
            Err(Error::NotFound(key))
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = normalize_object_key(key)?;
        if self.failing_removals.take() {
            return Err(Error::Storage(format!("injected removal failure for {key}")));
        }
        self.objects
            .lock()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or(Error::NotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::store::{encode_fields, CREATED_AT};

    fn fields(value: serde_json::Value) -> Fields {
        encode_fields(&value).unwrap()
    }

    fn ids(documents: &[Document]) -> Vec<String> {
        documents.iter().map(|doc| doc.id.clone()).collect()
    }

    #[tokio::test]
    async fn list_orders_by_creation_with_stable_ties() {
        let store = MemoryDocumentStore::new();
        let first = store.insert("notes", fields(json!({"n": 1}))).await.unwrap();
        let second = store.insert("notes", fields(json!({"n": 2}))).await.unwrap();
        let third = store.insert("notes", fields(json!({"n": 3}))).await.unwrap();

        let ascending = store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await
            .unwrap();
        assert_eq!(
            ids(&ascending),
            vec![first.id.clone(), second.id.clone(), third.id.clone()]
        );

        let descending = store
            .list_ordered("notes", CREATED_AT, Direction::Descending)
            .await
            .unwrap();
        assert_eq!(ids(&descending), vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn list_unknown_collection_is_empty() {
        let store = MemoryDocumentStore::new();
        let listed = store
            .list_ordered("photos", CREATED_AT, Direction::Descending)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn replace_fields_merges_top_level_keys() {
        let store = MemoryDocumentStore::new();
        let doc = store
            .insert("notes", fields(json!({"author": "A", "message": "hi"})))
            .await
            .unwrap();
        store
            .replace_fields("notes", &doc.id, fields(json!({"message": "hello"})))
            .await
            .unwrap();

        let listed = store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await
            .unwrap();
        assert_eq!(listed[0].fields, fields(json!({"author": "A", "message": "hello"})));
    }

    #[tokio::test]
    async fn missing_documents_report_not_found() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.remove("notes", "nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.replace_fields("notes", "nope", Fields::new()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryDocumentStore::new();
        store.fail_next_lists(1);
        let first = store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await;
        assert!(matches!(first, Err(Error::Database(_))));
        assert!(store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn object_store_roundtrip() {
        let store = MemoryObjectStore::new();
        store
            .upload("images/a.png", b"png", Some("image/png"))
            .await
            .unwrap();
        assert_eq!(
            store.resolve_url("images/a.png").await.unwrap(),
            "memory://images/a.png"
        );
        assert_eq!(
            store.get("images/a.png").await,
            Some((b"png".to_vec(), Some("image/png".to_string())))
        );

        store.remove("images/a.png").await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.resolve_url("images/a.png").await,
            Err(Error::NotFound(_))
        ));
    }
}
