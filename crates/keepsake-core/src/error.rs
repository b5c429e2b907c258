//! Error types for keepsake-core

use thiserror::Error;

/// Result type alias using keepsake-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in keepsake-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed user input, raised before any remote call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Document or object not found in the backing store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document store failure
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Object storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Identity service error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No active session for an operation that requires one
    #[error("Not signed in")]
    NoSession,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a failed call may succeed when repeated unchanged.
    ///
    /// Validation and not-found failures are deterministic and never retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::LibSql(_) | Self::Storage(_) | Self::Io(_)
        )
    }
}

impl From<crate::auth::AuthError> for Error {
    fn from(error: crate::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
