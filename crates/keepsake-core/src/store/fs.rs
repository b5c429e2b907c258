//! Object store rooted in a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use super::{normalize_object_key, ObjectStore};
use crate::{Error, Result};

/// Stores each object as a file under `root/<key>` and serves `file://` URLs.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<(String, PathBuf)> {
        let key = normalize_object_key(key)?;
        let path = key
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment));
        Ok((key, path))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, key: &str, bytes: &[u8], _content_type: Option<&str>) -> Result<()> {
        let (_, path) = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| Error::Storage(format!("create {}: {error}", parent.display())))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| Error::Storage(format!("write {}: {error}", path.display())))?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored object");
        Ok(())
    }

    async fn resolve_url(&self, key: &str) -> Result<String> {
        let (key, path) = self.object_path(key)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::NotFound(key));
        }
        Url::from_file_path(&path)
            .map(String::from)
            .map_err(|()| Error::Storage(format!("cannot build URL for {}", path.display())))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let (key, path) = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Err(Error::NotFound(key)),
            Err(error) => Err(Error::Storage(format!(
                "remove {}: {error}",
                path.display()
            ))),
        }
    }
}
