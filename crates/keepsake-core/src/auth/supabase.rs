//! Supabase email/password auth.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::{watch, Mutex};

use super::{
    validate_credentials, AuthError, AuthResult, AuthSession, AuthUser, IdentityService,
    IdentityWatch, SessionPersistence,
};
use crate::util::{is_http_url, unix_timestamp_now};

/// Thin client over the Supabase GoTrue REST API.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    auth_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseAuthClient {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        self.send_auth_request(request)
            .await?
            .into_session()?
            .ok_or_else(|| {
                AuthError::Api("Sign-in response did not include an active session".to_string())
            })
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );

        self.send_auth_request(request)
            .await?
            .into_session()?
            .ok_or_else(|| {
                AuthError::Api("Refresh response did not include an active session".to_string())
            })
    }

    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-invalid token still counts as signed out
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && body.contains("invalid_grant") {
                return Err(AuthError::InvalidCredentials);
            }
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }
}

/// [`IdentityService`] backed by Supabase, persisting the session locally.
pub struct SupabaseIdentityService {
    client: SupabaseAuthClient,
    persistence: Arc<dyn SessionPersistence>,
    session: Mutex<Option<AuthSession>>,
    current: watch::Sender<Option<AuthUser>>,
}

impl SupabaseIdentityService {
    pub fn new(client: SupabaseAuthClient, persistence: Arc<dyn SessionPersistence>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            client,
            persistence,
            session: Mutex::new(None),
            current,
        }
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.current.send_replace(user);
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentityService {
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        let session = self.client.sign_in(email, password).await?;
        self.persistence.save_session(&session)?;

        let user = session.user.clone();
        *self.session.lock().await = Some(session);
        self.publish(Some(user.clone()));
        tracing::info!(user = %user.display_name(), "Signed in with Supabase");
        Ok(user)
    }

    async fn restore(&self) -> AuthResult<Option<AuthUser>> {
        let Some(stored) = self.persistence.load_session()? else {
            return Ok(None);
        };

        let session = if stored.is_expired() {
            match self.client.refresh_session(&stored.refresh_token).await {
                Ok(refreshed) => {
                    self.persistence.save_session(&refreshed)?;
                    refreshed
                }
                Err(error) => {
                    tracing::warn!("Failed to refresh persisted session: {}", error);
                    self.persistence.clear_session()?;
                    return Ok(None);
                }
            }
        } else {
            stored
        };

        let user = session.user.clone();
        *self.session.lock().await = Some(session);
        self.publish(Some(user.clone()));
        Ok(Some(user))
    }

    fn watch(&self) -> IdentityWatch {
        IdentityWatch::new(self.current.subscribe())
    }

    async fn end_session(&self) -> AuthResult<()> {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            if let Err(error) = self.client.sign_out(&session.access_token).await {
                tracing::warn!("Remote sign-out failed, clearing local session anyway: {error}");
            }
        }
        self.persistence.clear_session()?;
        self.publish(None);
        Ok(())
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !is_http_url(trimmed) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

impl SupabaseAuthResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
        });

        match (self.access_token, self.refresh_token, expires_at, self.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user: user.into(),
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::MemorySessionPersistence;

    #[test]
    fn normalize_auth_url_appends_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
    }

    #[test]
    fn normalize_auth_url_keeps_existing_auth_path() {
        let normalized = normalize_auth_url("https://demo.supabase.co/auth/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/auth/v1");
        assert!(normalize_auth_url("demo.supabase.co").is_err());
    }

    #[test]
    fn response_with_expires_in_builds_session() {
        let response: SupabaseAuthResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user":{"id":"u","email":"me@x.com"}}"#,
        )
        .unwrap();
        let session = response.into_session().unwrap().unwrap();
        assert_eq!(session.user.email.as_deref(), Some("me@x.com"));
        assert!(!session.is_expired());
    }

    #[test]
    fn partial_response_is_an_error() {
        let response: SupabaseAuthResponse =
            serde_json::from_str(r#"{"access_token":"a","user":{"id":"u"}}"#).unwrap();
        assert!(matches!(response.into_session(), Err(AuthError::Api(_))));
    }

    #[test]
    fn parse_api_error_prefers_message_fields() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"msg":"Email not confirmed"}"#),
            "Email not confirmed (400)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[tokio::test]
    async fn restore_uses_unexpired_persisted_session_without_network() {
        let persistence = MemorySessionPersistence::new();
        persistence
            .save_session(&AuthSession {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                expires_at: unix_timestamp_now() + 3600,
                user: AuthUser {
                    id: "u".to_string(),
                    email: Some("me@x.com".to_string()),
                },
            })
            .unwrap();

        let client = SupabaseAuthClient::new("https://demo.supabase.co", "anon").unwrap();
        let service = SupabaseIdentityService::new(client, Arc::new(persistence));
        let restored = service.restore().await.unwrap().unwrap();
        assert_eq!(restored.id, "u");
        assert_eq!(service.watch().current(), Some(restored));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires SUPABASE_URL, SUPABASE_ANON_KEY, KEEPSAKE_TEST_EMAIL and KEEPSAKE_TEST_PASSWORD"]
    async fn sign_in_with_supabase() {
        let _ = dotenvy::dotenv();
        let var = |key: &str| std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set"));

        let client = SupabaseAuthClient::new(var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")).unwrap();
        let service =
            SupabaseIdentityService::new(client, Arc::new(MemorySessionPersistence::new()));
        service
            .authenticate(&var("KEEPSAKE_TEST_EMAIL"), &var("KEEPSAKE_TEST_PASSWORD"))
            .await
            .unwrap();
        service.end_session().await.unwrap();
        assert_eq!(service.watch().current(), None);
    }
}
