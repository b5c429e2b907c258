//! Offline document store persisted as a single JSON snapshot file.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::memory::Collections;
use super::{normalize_collection, Direction, Document, DocumentRef, DocumentStore, Fields};
use crate::{Error, Result};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    #[serde(flatten)]
    collections: Collections,
}

/// Document store that keeps everything in memory and rewrites a JSON file
/// after every mutation.
#[derive(Debug)]
pub struct SnapshotDocumentStore {
    path: PathBuf,
    state: Mutex<Collections>,
}

impl SnapshotDocumentStore {
    /// Open a snapshot file, starting empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let collections = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let snapshot: SnapshotFile = serde_json::from_str(&contents)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(Error::Database(format!(
                    "unsupported snapshot version {} in {}",
                    snapshot.version,
                    path.display()
                )));
            }
            snapshot.collections
        } else {
            Collections::default()
        };

        tracing::debug!(path = %path.display(), "Opened snapshot document store");
        Ok(Self {
            path,
            state: Mutex::new(collections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, collections: &Collections) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            collections: collections.clone(),
        };
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&snapshot)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SnapshotDocumentStore {
    async fn list_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let collection = normalize_collection(collection)?;
        Ok(self.state.lock().await.list(collection, order_field, direction))
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentRef> {
        let collection = normalize_collection(collection)?;
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let reference = next.insert(collection, fields);
        self.persist(&next)?;
        *state = next;
        Ok(reference)
    }

    async fn replace_fields(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let collection = normalize_collection(collection)?;
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.replace_fields(collection, id, fields)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let collection = normalize_collection(collection)?;
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.remove(collection, id)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}
