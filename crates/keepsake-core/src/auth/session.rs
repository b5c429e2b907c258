//! Explicit session handle passed to everything that needs the signed-in user.

use std::sync::Arc;

use super::{AuthUser, IdentityService, IdentityWatch};
use crate::{Error, Result};

/// Owns the link to an [`IdentityService`] for the lifetime of a front end.
///
/// Created with [`Session::start`], which restores any persisted session, and
/// torn down with [`Session::end`].
#[derive(Clone)]
pub struct Session {
    service: Arc<dyn IdentityService>,
    watch: IdentityWatch,
}

impl Session {
    pub async fn start(service: Arc<dyn IdentityService>) -> Result<Self> {
        let watch = service.watch();
        if let Some(user) = service.restore().await? {
            tracing::debug!(user = %user.display_name(), "Restored session");
        }
        Ok(Self { service, watch })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        Ok(self.service.authenticate(email, password).await?)
    }

    /// The currently signed-in user, if any.
    pub fn identity(&self) -> Option<AuthUser> {
        self.watch.current()
    }

    pub fn is_active(&self) -> bool {
        self.identity().is_some()
    }

    /// The signed-in user, or [`Error::NoSession`].
    pub fn require(&self) -> Result<AuthUser> {
        self.identity().ok_or(Error::NoSession)
    }

    /// Subscribe to identity changes.
    pub fn watch(&self) -> IdentityWatch {
        self.watch.clone()
    }

    /// Sign out; the service publishes `None` to every watcher.
    pub async fn end(self) -> Result<()> {
        self.service.end_session().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, MemorySessionPersistence, StaticIdentityService};

    fn service() -> Arc<dyn IdentityService> {
        Arc::new(StaticIdentityService::new(
            vec![Credential::new("me@example.com", "pw")],
            Arc::new(MemorySessionPersistence::new()),
        ))
    }

    #[tokio::test]
    async fn lifecycle() {
        let session = Session::start(service()).await.unwrap();
        assert!(!session.is_active());
        assert!(matches!(session.require(), Err(Error::NoSession)));

        session.sign_in("me@example.com", "pw").await.unwrap();
        assert!(session.is_active());

        let observer = session.clone();
        session.end().await.unwrap();
        assert!(!observer.is_active());
    }

    #[tokio::test]
    async fn failed_sign_in_maps_to_auth_error() {
        let session = Session::start(service()).await.unwrap();
        assert!(matches!(
            session.sign_in("me@example.com", "wrong").await,
            Err(Error::Auth(_))
        ));
    }
}
