//! Backend selection.
//!
//! A front end runs against one of two backends:
//! - `local`: a JSON snapshot document store and a blob directory under a
//!   data directory, with a configured account list
//! - `remote`: a Turso replica for documents, Cloudflare R2 for images and
//!   Supabase for sign-in
//!
//! Both are read from environment-style variables through a lookup closure so
//! tests can feed a map instead of the process environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::Credential;
use crate::store::{R2Config, ReplicaConfig};
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_BACKEND: &str = "KEEPSAKE_BACKEND";
pub const ENV_DATA_DIR: &str = "KEEPSAKE_DATA_DIR";
pub const ENV_CREDENTIALS: &str = "KEEPSAKE_CREDENTIALS";
pub const ENV_TURSO_URL: &str = "TURSO_DATABASE_URL";
pub const ENV_TURSO_TOKEN: &str = "TURSO_AUTH_TOKEN";
pub const ENV_TURSO_SYNC_INTERVAL: &str = "TURSO_SYNC_INTERVAL_SECS";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

const SNAPSHOT_FILE: &str = "keepsake.json";
const BLOBS_DIR: &str = "blobs";
const REPLICA_FILE: &str = "replica.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(Error::Validation(format!(
                "{ENV_BACKEND} must be `local` or `remote`, got `{other}`"
            ))),
        }
    }
}

/// Offline backend rooted at a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub data_dir: PathBuf,
    /// Accounts allowed to sign in
    pub credentials: Vec<Credential>,
}

impl LocalConfig {
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join(BLOBS_DIR)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub data_dir: PathBuf,
    pub replica: ReplicaConfig,
    pub objects: R2Config,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl RemoteConfig {
    /// Local file backing the embedded replica.
    pub fn replica_path(&self) -> PathBuf {
        self.data_dir.join(REPLICA_FILE)
    }
}

#[derive(Debug, Clone)]
pub enum BackendConfig {
    Local(LocalConfig),
    Remote(RemoteConfig),
}

impl BackendConfig {
    /// Read the configuration from the process environment.
    pub fn from_env(default_data_dir: &Path) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_data_dir)
    }

    /// Read the configuration through a variable lookup.
    ///
    /// `default_data_dir` is used when `KEEPSAKE_DATA_DIR` is unset. Partial
    /// configurations are rejected with the names of the missing variables.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_data_dir: &Path,
    ) -> Result<Self> {
        let read = |key: &str| normalize_text_option(lookup(key));

        let kind = read(ENV_BACKEND)
            .map(|value| value.parse::<BackendKind>())
            .transpose()?
            .unwrap_or_default();
        let data_dir = read(ENV_DATA_DIR)
            .map_or_else(|| default_data_dir.to_path_buf(), PathBuf::from);

        match kind {
            BackendKind::Local => {
                let Some(credentials) = read(ENV_CREDENTIALS) else {
                    return Err(missing_variables(kind, &[ENV_CREDENTIALS]));
                };
                let credentials = Credential::parse_list(&credentials)?;
                if credentials.is_empty() {
                    return Err(Error::Validation(format!(
                        "{ENV_CREDENTIALS} must list at least one email:password pair"
                    )));
                }
                Ok(Self::Local(LocalConfig {
                    data_dir,
                    credentials,
                }))
            }
            BackendKind::Remote => Self::remote_from_lookup(&lookup, &read, data_dir),
        }
    }

    fn remote_from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        read: &impl Fn(&str) -> Option<String>,
        data_dir: PathBuf,
    ) -> Result<Self> {
        let turso_url = read(ENV_TURSO_URL);
        let turso_token = read(ENV_TURSO_TOKEN);
        let supabase_url = read(ENV_SUPABASE_URL);
        let supabase_anon_key = read(ENV_SUPABASE_ANON_KEY);
        let objects = R2Config::from_lookup(lookup)?;

        let (
            Some(turso_url),
            Some(turso_token),
            Some(supabase_url),
            Some(supabase_anon_key),
            Some(objects),
        ) = (
            turso_url.clone(),
            turso_token.clone(),
            supabase_url.clone(),
            supabase_anon_key.clone(),
            objects.clone(),
        )
        else {
            let mut missing = [
                (ENV_TURSO_URL, turso_url.is_none()),
                (ENV_TURSO_TOKEN, turso_token.is_none()),
                (ENV_SUPABASE_URL, supabase_url.is_none()),
                (ENV_SUPABASE_ANON_KEY, supabase_anon_key.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect::<Vec<_>>();
            if objects.is_none() {
                missing.push("R2_*");
            }
            return Err(missing_variables(BackendKind::Remote, &missing));
        };

        if !is_http_url(&supabase_url) {
            return Err(Error::Validation(format!(
                "{ENV_SUPABASE_URL} must start with http:// or https://"
            )));
        }

        let mut replica = ReplicaConfig::new(turso_url, turso_token);
        if let Some(seconds) = read(ENV_TURSO_SYNC_INTERVAL) {
            let seconds = seconds.parse::<u64>().map_err(|_| {
                Error::Validation(format!("{ENV_TURSO_SYNC_INTERVAL} must be a whole number"))
            })?;
            replica = if seconds == 0 {
                replica.without_auto_sync()
            } else {
                replica.with_sync_interval(Duration::from_secs(seconds))
            };
        }

        Ok(Self::Remote(RemoteConfig {
            data_dir,
            replica,
            objects,
            supabase_url,
            supabase_anon_key,
        }))
    }

    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Local(_) => BackendKind::Local,
            Self::Remote(_) => BackendKind::Remote,
        }
    }

    pub fn data_dir(&self) -> &Path {
        match self {
            Self::Local(config) => &config.data_dir,
            Self::Remote(config) => &config.data_dir,
        }
    }
}

fn missing_variables(kind: BackendKind, missing: &[&str]) -> Error {
    Error::Validation(format!(
        "{kind} backend configuration is incomplete. Missing: {}",
        missing.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(vars: &[(&str, &str)]) -> Result<BackendConfig> {
        let map = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        BackendConfig::from_lookup(|key| map.get(key).cloned(), Path::new("/tmp/keepsake"))
    }

    fn remote_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_BACKEND, "remote"),
            (ENV_TURSO_URL, "libsql://keepsake.turso.io"),
            (ENV_TURSO_TOKEN, "token"),
            (ENV_SUPABASE_URL, "https://project.supabase.co"),
            (ENV_SUPABASE_ANON_KEY, "anon"),
            ("R2_ACCOUNT_ID", "account"),
            ("R2_BUCKET", "photos"),
            ("R2_ACCESS_KEY_ID", "AKID"),
            ("R2_SECRET_ACCESS_KEY", "SECRET"),
        ]
    }

    #[test]
    fn local_is_the_default_backend() {
        let config = parse(&[(ENV_CREDENTIALS, "me@example.com:pw, you@example.com:pw2")]).unwrap();
        let BackendConfig::Local(local) = config else {
            panic!("expected local backend");
        };
        assert_eq!(local.credentials.len(), 2);
        assert_eq!(local.snapshot_path(), PathBuf::from("/tmp/keepsake/keepsake.json"));
        assert_eq!(local.blobs_dir(), PathBuf::from("/tmp/keepsake/blobs"));
    }

    #[test]
    fn data_dir_can_be_overridden() {
        let config = parse(&[
            (ENV_CREDENTIALS, "me@example.com:pw"),
            (ENV_DATA_DIR, "/srv/keepsake"),
        ])
        .unwrap();
        assert_eq!(config.data_dir(), Path::new("/srv/keepsake"));
    }

    #[test]
    fn local_requires_credentials() {
        let error = parse(&[]).unwrap_err();
        assert!(error.to_string().contains(ENV_CREDENTIALS));

        assert!(parse(&[(ENV_CREDENTIALS, "no-colon")]).is_err());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            parse(&[(ENV_BACKEND, "cloud")]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn remote_reads_every_service() {
        let mut vars = remote_vars();
        vars.push((ENV_TURSO_SYNC_INTERVAL, "0"));
        let BackendConfig::Remote(remote) = parse(&vars).unwrap() else {
            panic!("expected remote backend");
        };
        assert_eq!(remote.replica.url, "libsql://keepsake.turso.io");
        assert_eq!(remote.replica.sync_interval, None);
        assert_eq!(remote.objects.bucket, "photos");
        assert_eq!(remote.replica_path(), PathBuf::from("/tmp/keepsake/replica.db"));
    }

    #[test]
    fn partial_remote_lists_missing_variables() {
        let vars = remote_vars()
            .into_iter()
            .filter(|(key, _)| *key != ENV_TURSO_TOKEN && !key.starts_with("R2_"))
            .collect::<Vec<_>>();
        let message = parse(&vars).unwrap_err().to_string();
        assert!(message.contains(ENV_TURSO_TOKEN));
        assert!(message.contains("R2_*"));
        assert!(!message.contains(ENV_SUPABASE_URL));
    }

    #[test]
    fn remote_rejects_non_http_supabase_url() {
        let vars = remote_vars()
            .into_iter()
            .map(|(key, value)| {
                if key == ENV_SUPABASE_URL {
                    (key, "project.supabase.co")
                } else {
                    (key, value)
                }
            })
            .collect::<Vec<_>>();
        assert!(parse(&vars).is_err());
    }
}
