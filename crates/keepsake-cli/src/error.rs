use std::io;

use keepsake_core::routes::Route;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] keepsake_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{page} requires a signed-in session. Run `keepsake auth login` first.")]
    SignInRequired { page: Route },
    #[error("No {kind} matches id/prefix: {query}")]
    NotFound { kind: &'static str, query: String },
    #[error("{0}")]
    AmbiguousId(String),
    #[error("{kind} ID cannot be empty")]
    EmptyId { kind: &'static str },
}
