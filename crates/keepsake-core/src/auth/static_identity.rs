//! Identity service over a fixed list of accounts.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    validate_credentials, AuthError, AuthResult, AuthSession, AuthUser, IdentityService,
    IdentityWatch, SessionPersistence,
};
use crate::util::{sanitize_token, unix_timestamp_now};

const SESSION_LIFETIME_SECONDS: i64 = 30 * 24 * 60 * 60;

/// One configured account
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credential {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Parse a comma-separated `email:password` list.
    pub fn parse_list(value: &str) -> AuthResult<Vec<Self>> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::from_str)
            .collect()
    }

    fn user(&self) -> AuthUser {
        let email = self.email.trim().to_lowercase();
        AuthUser {
            id: format!("local-{}", sanitize_token(&email)),
            email: Some(email),
        }
    }
}

impl FromStr for Credential {
    type Err = AuthError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let (email, password) = entry.split_once(':').ok_or(AuthError::InvalidConfiguration(
            "credentials must be listed as email:password",
        ))?;
        validate_credentials(email, password)?;
        Ok(Self::new(email.trim(), password))
    }
}

/// Accepts only the configured accounts; sessions are local tokens.
pub struct StaticIdentityService {
    credentials: Vec<Credential>,
    persistence: Arc<dyn SessionPersistence>,
    current: watch::Sender<Option<AuthUser>>,
}

impl StaticIdentityService {
    pub fn new(credentials: Vec<Credential>, persistence: Arc<dyn SessionPersistence>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            credentials,
            persistence,
            current,
        }
    }
}

#[async_trait]
impl IdentityService for StaticIdentityService {
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        validate_credentials(email, password)?;

        let credential = self
            .credentials
            .iter()
            .find(|candidate| {
                candidate.email.trim().eq_ignore_ascii_case(email.trim())
                    && candidate.password == password
            })
            .ok_or(AuthError::InvalidCredentials)?;

        let user = credential.user();
        self.persistence.save_session(&AuthSession {
            access_token: Uuid::now_v7().to_string(),
            refresh_token: Uuid::now_v7().to_string(),
            expires_at: unix_timestamp_now() + SESSION_LIFETIME_SECONDS,
            user: user.clone(),
        })?;
        self.current.send_replace(Some(user.clone()));
        tracing::info!(user = %user.display_name(), "Signed in");
        Ok(user)
    }

    async fn restore(&self) -> AuthResult<Option<AuthUser>> {
        let Some(session) = self.persistence.load_session()? else {
            return Ok(None);
        };

        let still_allowed = self
            .credentials
            .iter()
            .any(|credential| credential.user() == session.user);
        if session.is_expired() || !still_allowed {
            tracing::debug!("Discarding stale local session");
            self.persistence.clear_session()?;
            return Ok(None);
        }

        self.current.send_replace(Some(session.user.clone()));
        Ok(Some(session.user))
    }

    fn watch(&self) -> IdentityWatch {
        IdentityWatch::new(self.current.subscribe())
    }

    async fn end_session(&self) -> AuthResult<()> {
        self.persistence.clear_session()?;
        self.current.send_replace(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::MemorySessionPersistence;

    fn service(persistence: &MemorySessionPersistence) -> StaticIdentityService {
        StaticIdentityService::new(
            vec![Credential::new("Me@Example.com", "hunter2")],
            Arc::new(persistence.clone()),
        )
    }

    #[test]
    fn parse_list_reads_pairs() {
        let credentials = Credential::parse_list("a@x.com:one, b@x.com:t:wo,").unwrap();
        assert_eq!(
            credentials,
            vec![Credential::new("a@x.com", "one"), Credential::new("b@x.com", "t:wo")]
        );
        assert!(Credential::parse_list("no-separator").is_err());
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", Credential::new("a@x.com", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn authenticate_publishes_identity() {
        let persistence = MemorySessionPersistence::new();
        let service = service(&persistence);
        let mut watch = service.watch();
        assert_eq!(watch.current(), None);

        let user = service.authenticate("me@example.com", "hunter2").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("me@example.com"));
        assert_eq!(watch.changed().await, Some(Some(user)));
        assert!(persistence.load_session().unwrap().is_some());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let persistence = MemorySessionPersistence::new();
        let service = service(&persistence);
        assert!(matches!(
            service.authenticate("me@example.com", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert_eq!(service.watch().current(), None);
    }

    #[tokio::test]
    async fn restore_and_end_session() {
        let persistence = MemorySessionPersistence::new();
        service(&persistence)
            .authenticate("me@example.com", "hunter2")
            .await
            .unwrap();

        let restarted = service(&persistence);
        let restored = restarted.restore().await.unwrap();
        assert!(restored.is_some());
        assert_eq!(restarted.watch().current(), restored);

        restarted.end_session().await.unwrap();
        assert_eq!(restarted.watch().current(), None);
        assert!(persistence.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_drops_sessions_for_removed_accounts() {
        let persistence = MemorySessionPersistence::new();
        service(&persistence)
            .authenticate("me@example.com", "hunter2")
            .await
            .unwrap();

        let reconfigured = StaticIdentityService::new(
            vec![Credential::new("other@example.com", "pw")],
            Arc::new(persistence.clone()),
        );
        assert_eq!(reconfigured.restore().await.unwrap(), None);
        assert!(persistence.load_session().unwrap().is_none());
    }
}
