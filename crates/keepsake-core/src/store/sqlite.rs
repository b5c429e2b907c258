//! libSQL-backed document store (local file, in-memory, or Turso replica)

use crate::error::{Error, Result};
use crate::util::unix_millis_now;
use async_trait::async_trait;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;
use std::time::Duration;

use super::{
    migrations, new_document_id, normalize_collection, Direction, Document, DocumentRef,
    DocumentStore, Fields, CREATED_AT,
};

/// Configuration for a Turso embedded replica
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: String,
    /// Authentication token for remote database
    pub auth_token: String,
    /// Automatic sync interval, `None` for manual sync only
    pub sync_interval: Option<Duration>,
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            sync_interval: Some(Duration::from_secs(60)),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replicated: bool,
}

impl Database {
    /// Open a local-only database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::prepare(db, false).await
    }

    /// Open an in-memory database
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::prepare(db, false).await
    }

    /// Open an embedded replica of a remote Turso database.
    ///
    /// Reads are served from the local file, writes go to the remote and sync back.
    pub async fn open_replica(
        local_path: impl AsRef<Path>,
        config: &ReplicaConfig,
    ) -> Result<Self> {
        if config.url.trim().is_empty() || config.auth_token.trim().is_empty() {
            return Err(Error::Validation(
                "replica URL and auth token are required".to_string(),
            ));
        }

        let path_str = local_path.as_ref().to_string_lossy().to_string();
        let mut builder =
            Builder::new_remote_replica(&path_str, config.url.clone(), config.auth_token.clone());
        if let Some(interval) = config.sync_interval {
            builder = builder.sync_interval(interval);
            tracing::debug!("Automatic sync interval set to {:?}", interval);
        }

        let db = builder.build().await?;
        tracing::debug!("Performing initial sync...");
        db.sync().await?;
        Self::prepare(db, true).await
    }

    async fn prepare(db: LibSqlDatabase, replicated: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            db,
            conn,
            replicated,
        };
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) -> Result<()> {
        // Pragmas below are best-effort on remote replicas
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Pull remote changes into the replica (no-op for local databases).
    pub async fn sync(&self) -> Result<()> {
        if self.replicated {
            self.db.sync().await?;
            tracing::debug!("Database synced with remote");
        }
        Ok(())
    }

    pub const fn is_replica(&self) -> bool {
        self.replicated
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// [`DocumentStore`] over a single `documents` table holding JSON bodies.
pub struct LibSqlDocumentStore {
    db: Database,
}

impl LibSqlDocumentStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    pub async fn open_replica(
        local_path: impl AsRef<Path>,
        config: &ReplicaConfig,
    ) -> Result<Self> {
        Ok(Self::new(Database::open_replica(local_path, config).await?))
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }
}

fn order_clause(order_field: &str, direction: Direction) -> Result<String> {
    let keyword = match direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    };
    if order_field == CREATED_AT {
        return Ok(format!("created_at {keyword}, seq {keyword}"));
    }
    if order_field.is_empty()
        || !order_field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(Error::Validation(format!(
            "invalid order field: {order_field:?}"
        )));
    }
    Ok(format!(
        "json_extract(fields, '$.{order_field}') {keyword}, seq {keyword}"
    ))
}

#[async_trait]
impl DocumentStore for LibSqlDocumentStore {
    async fn list_ordered(
        &self,
        collection: &str,
        order_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let collection = normalize_collection(collection)?;
        let order = order_clause(order_field, direction)?;

        if let Err(error) = self.db.sync().await {
            tracing::warn!("Replica sync before listing {collection} failed: {error}");
        }

        let sql = format!(
            "SELECT id, created_at, fields FROM documents WHERE collection = ?1 ORDER BY {order}"
        );
        let mut rows = self
            .db
            .connection()
            .query(&sql, libsql::params![collection])
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            let fields: String = row.get(2)?;
            documents.push(Document {
                id: row.get(0)?,
                created_at: row.get(1)?,
                fields: serde_json::from_str::<Fields>(&fields)?,
            });
        }
        Ok(documents)
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentRef> {
        let collection = normalize_collection(collection)?;
        let reference = DocumentRef {
            id: new_document_id(),
            created_at: unix_millis_now(),
        };
        let body = serde_json::to_string(&fields)?;

        self.db
            .connection()
            .execute(
                "INSERT INTO documents (collection, id, created_at, fields) VALUES (?1, ?2, ?3, ?4)",
                libsql::params![collection, reference.id.as_str(), reference.created_at, body],
            )
            .await?;
        Ok(reference)
    }

    async fn replace_fields(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let collection = normalize_collection(collection)?;
        let patch = serde_json::to_string(&fields)?;

        let affected = self
            .db
            .connection()
            .execute(
                "UPDATE documents SET fields = json_patch(fields, ?3) WHERE collection = ?1 AND id = ?2",
                libsql::params![collection, id, patch],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let collection = normalize_collection(collection)?;
        let affected = self
            .db
            .connection()
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                libsql::params![collection, id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("{collection}/{id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::encode_fields;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::env;
    use tempfile::tempdir;

    fn body(value: serde_json::Value) -> Fields {
        encode_fields(&value).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_in_memory_is_local() {
        let store = LibSqlDocumentStore::open_in_memory().await.unwrap();
        assert!(!store.database().is_replica());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn insert_list_update_remove() {
        let store = LibSqlDocumentStore::open_in_memory().await.unwrap();
        let first = store
            .insert("notes", body(json!({"author": "A", "message": "one"})))
            .await
            .unwrap();
        let second = store
            .insert("notes", body(json!({"author": "B", "message": "two"})))
            .await
            .unwrap();

        let listed = store
            .list_ordered("notes", CREATED_AT, Direction::Descending)
            .await
            .unwrap();
        assert_eq!(
            listed.iter().map(|doc| doc.id.as_str()).collect::<Vec<_>>(),
            vec![second.id.as_str(), first.id.as_str()]
        );

        store
            .replace_fields("notes", &first.id, body(json!({"message": "uno"})))
            .await
            .unwrap();
        let by_author = store
            .list_ordered("notes", "author", Direction::Ascending)
            .await
            .unwrap();
        assert_eq!(by_author[0].fields, body(json!({"author": "A", "message": "uno"})));

        store.remove("notes", &second.id).await.unwrap();
        assert!(matches!(
            store.remove("notes", &second.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn collections_are_isolated() {
        let store = LibSqlDocumentStore::open_in_memory().await.unwrap();
        store.insert("photos", body(json!({"alt": "x"}))).await.unwrap();
        assert!(store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_database_persists() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("keepsake.db");
        {
            let store = LibSqlDocumentStore::open(&path).await.unwrap();
            store.insert("notes", body(json!({"message": "hi"}))).await.unwrap();
        }
        let store = LibSqlDocumentStore::open(&path).await.unwrap();
        let listed = store
            .list_ordered("notes", CREATED_AT, Direction::Ascending)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn order_clause_rejects_injection() {
        assert!(order_clause("created_at", Direction::Ascending).is_ok());
        assert!(order_clause("photoId", Direction::Descending).is_ok());
        assert!(order_clause("x'); DROP TABLE documents; --", Direction::Ascending).is_err());
    }

    /// Run with: TURSO_DATABASE_URL=... TURSO_AUTH_TOKEN=... cargo test replica_with_turso -- --ignored
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires TURSO_DATABASE_URL and TURSO_AUTH_TOKEN"]
    async fn replica_with_turso() {
        let url = env::var("TURSO_DATABASE_URL").expect("TURSO_DATABASE_URL must be set");
        let token = env::var("TURSO_AUTH_TOKEN").expect("TURSO_AUTH_TOKEN must be set");

        let tmp = tempdir().unwrap();
        let config = ReplicaConfig::new(url, token);
        let store = LibSqlDocumentStore::open_replica(tmp.path().join("replica.db"), &config)
            .await
            .unwrap();
        assert!(store.database().is_replica());
        store
            .list_ordered("notes", CREATED_AT, Direction::Descending)
            .await
            .unwrap();
    }
}
