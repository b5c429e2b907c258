//! Opens the configured backend and hands out the sync objects built on it.

use std::sync::Arc;

use crate::auth::{
    Credential, IdentityService, MemorySessionPersistence, Session, SessionPersistence,
    StaticIdentityService, SupabaseAuthClient, SupabaseIdentityService,
};
use crate::config::BackendConfig;
use crate::store::{
    DocumentStore, FsObjectStore, LibSqlDocumentStore, MemoryDocumentStore, MemoryObjectStore,
    ObjectStore, R2ObjectStore, SnapshotDocumentStore,
};
use crate::sync::{GallerySync, Notifier, NotesSync};
use crate::Result;

/// The three boundaries every front end needs.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub identity: Arc<dyn IdentityService>,
}

impl Backend {
    /// Open the stores and identity service described by `config`.
    ///
    /// Sessions are kept in `persistence` so a later run can restore them.
    pub async fn open(
        config: &BackendConfig,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self> {
        std::fs::create_dir_all(config.data_dir())?;

        match config {
            BackendConfig::Local(local) => {
                tracing::info!(
                    data_dir = %local.data_dir.display(),
                    "Running against the local backend"
                );
                Ok(Self {
                    documents: Arc::new(SnapshotDocumentStore::open(local.snapshot_path())?),
                    objects: Arc::new(FsObjectStore::open(local.blobs_dir())?),
                    identity: Arc::new(StaticIdentityService::new(
                        local.credentials.clone(),
                        persistence,
                    )),
                })
            }
            BackendConfig::Remote(remote) => {
                tracing::info!("Syncing documents with Turso: {}", remote.replica.url);
                let documents =
                    LibSqlDocumentStore::open_replica(remote.replica_path(), &remote.replica)
                        .await?;
                let client = SupabaseAuthClient::new(
                    &remote.supabase_url,
                    remote.supabase_anon_key.clone(),
                )?;
                Ok(Self {
                    documents: Arc::new(documents),
                    objects: Arc::new(R2ObjectStore::new(remote.objects.clone())),
                    identity: Arc::new(SupabaseIdentityService::new(client, persistence)),
                })
            }
        }
    }

    /// Process-local backend with the given accounts (primarily for tests).
    pub fn in_memory(credentials: Vec<Credential>) -> Self {
        Self {
            documents: Arc::new(MemoryDocumentStore::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            identity: Arc::new(StaticIdentityService::new(
                credentials,
                Arc::new(MemorySessionPersistence::new()),
            )),
        }
    }

    /// Start a session, restoring a persisted sign-in when there is one.
    pub async fn start_session(&self) -> Result<Session> {
        Session::start(Arc::clone(&self.identity)).await
    }

    pub fn gallery(&self, notifier: Arc<dyn Notifier>) -> GallerySync {
        GallerySync::new(
            Arc::clone(&self.documents),
            Arc::clone(&self.objects),
            notifier,
        )
    }

    pub fn notes(&self, notifier: Arc<dyn Notifier>) -> NotesSync {
        NotesSync::new(Arc::clone(&self.documents), notifier)
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_CREDENTIALS;
    use crate::models::NoteDraft;
    use crate::sync::LogNotifier;

    #[tokio::test]
    async fn local_backend_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig::from_lookup(
            |key| (key == ENV_CREDENTIALS).then(|| "me@example.com:pw".to_string()),
            dir.path(),
        )
        .unwrap();
        let persistence = Arc::new(MemorySessionPersistence::new());

        let backend = Backend::open(&config, persistence.clone()).await.unwrap();
        let session = backend.start_session().await.unwrap();
        session.sign_in("me@example.com", "pw").await.unwrap();
        let mut notes = backend.notes(Arc::new(LogNotifier));
        notes
            .create_note(&NoteDraft::new("Sam", "still here"))
            .await
            .unwrap();
        drop(backend);

        let reopened = Backend::open(&config, persistence).await.unwrap();
        assert!(reopened.start_session().await.unwrap().is_active());
        let mut notes = reopened.notes(Arc::new(LogNotifier));
        assert_eq!(notes.load().await.unwrap(), 1);
        assert_eq!(notes.notes()[0].message, "still here");
        assert!(dir.path().join("keepsake.json").exists());
    }

    #[tokio::test]
    async fn in_memory_backend_starts_signed_out() {
        let backend = Backend::in_memory(vec![Credential::new("me@example.com", "pw")]);
        let session = backend.start_session().await.unwrap();
        assert!(!session.is_active());
    }
}
