//! Identity service boundary and the explicit session handle.
//!
//! Backends:
//! - [`StaticIdentityService`]: a configured list of email/password pairs
//! - [`SupabaseIdentityService`]: Supabase email/password auth over HTTP
//!
//! Both persist their session through a [`SessionPersistence`] so a restart
//! can restore it.

mod session;
mod static_identity;
mod supabase;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::util::unix_timestamp_now;

pub use self::session::Session;
pub use self::static_identity::{Credential, StaticIdentityService};
pub use self::supabase::{normalize_auth_url, SupabaseAuthClient, SupabaseIdentityService};

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// The signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    /// Email when known, otherwise the user id.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry (Unix seconds)
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth is not configured: set both SUPABASE_URL and SUPABASE_ANON_KEY.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0} is required")]
    MissingCredential(&'static str),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where a signed-in session is kept between runs.
pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Process-local persistence, keyed by a caller-chosen slot name.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionPersistence {
    slot: String,
    sessions: Arc<Mutex<HashMap<String, AuthSession>>>,
}

impl MemorySessionPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Another view over the same sessions, using a different slot.
    #[must_use]
    pub fn slot(&self, name: impl Into<String>) -> Self {
        Self {
            slot: name.into(),
            sessions: Arc::clone(&self.sessions),
        }
    }

    fn sessions(&self) -> AuthResult<std::sync::MutexGuard<'_, HashMap<String, AuthSession>>> {
        self.sessions
            .lock()
            .map_err(|_| AuthError::SecureStorage("session store lock poisoned".to_string()))
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        Ok(self.sessions()?.get(&self.slot).cloned())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        self.sessions()?.insert(self.slot.clone(), session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        self.sessions()?.remove(&self.slot);
        Ok(())
    }
}

/// Receiver for "current identity changed" notifications.
#[derive(Debug, Clone)]
pub struct IdentityWatch {
    receiver: watch::Receiver<Option<AuthUser>>,
}

impl IdentityWatch {
    pub(crate) const fn new(receiver: watch::Receiver<Option<AuthUser>>) -> Self {
        Self { receiver }
    }

    /// The identity as of the latest notification.
    pub fn current(&self) -> Option<AuthUser> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change; `None` once the service has gone away.
    pub async fn changed(&mut self) -> Option<Option<AuthUser>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

/// Hosted email/password authentication.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Sign in and publish the new identity.
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<AuthUser>;

    /// Restore a persisted session, publishing it when still valid.
    async fn restore(&self) -> AuthResult<Option<AuthUser>>;

    /// Stream of identity changes, starting from the current identity.
    fn watch(&self) -> IdentityWatch;

    /// Sign out and publish `None`.
    async fn end_session(&self) -> AuthResult<()>;
}

pub(crate) fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::MissingCredential("Email"));
    }
    if password.trim().is_empty() {
        return Err(AuthError::MissingCredential("Password"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user".to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn expiry_includes_skew() {
        assert!(session(unix_timestamp_now() + 10).is_expired());
        assert!(!session(unix_timestamp_now() + 3600).is_expired());
    }

    #[test]
    fn memory_persistence_slots_are_independent() {
        let shared = MemorySessionPersistence::new();
        let first = shared.slot("first");
        let second = shared.slot("second");

        first.save_session(&session(1)).unwrap();
        assert!(first.load_session().unwrap().is_some());
        assert!(second.load_session().unwrap().is_none());

        first.clear_session().unwrap();
        assert!(first.load_session().unwrap().is_none());
    }

    #[test]
    fn credentials_must_be_present() {
        assert!(matches!(
            validate_credentials(" ", "pw"),
            Err(AuthError::MissingCredential("Email"))
        ));
        assert!(matches!(
            validate_credentials("a@b.c", ""),
            Err(AuthError::MissingCredential("Password"))
        ));
        assert!(validate_credentials("a@b.c", "pw").is_ok());
    }
}
