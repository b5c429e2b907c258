//! Cloudflare R2 object store over the S3-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use super::{normalize_object_key, ObjectStore};
use crate::util::is_http_url;
use crate::{Error, Result};

pub(crate) const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
pub(crate) const ENV_BUCKET: &str = "R2_BUCKET";
pub(crate) const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
pub(crate) const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
pub(crate) const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

/// Lifetime of presigned URLs handed out when the bucket is private.
const PRESIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cloudflare R2 configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Optional public URL base for serving images.
    pub public_base_url: Option<String>,
}

impl R2Config {
    /// Load R2 configuration through a variable lookup.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let account_id = read(ENV_ACCOUNT_ID);
        let bucket = read(ENV_BUCKET);
        let access_key_id = read(ENV_ACCESS_KEY_ID);
        let secret_access_key = read(ENV_SECRET_ACCESS_KEY);
        let public_base_url = read(ENV_PUBLIC_BASE_URL);

        if account_id.is_none()
            && bucket.is_none()
            && access_key_id.is_none()
            && secret_access_key.is_none()
            && public_base_url.is_none()
        {
            return Ok(None);
        }

        let (Some(account_id), Some(bucket), Some(access_key_id), Some(secret_access_key)) =
            (account_id.clone(), bucket.clone(), access_key_id.clone(), secret_access_key.clone())
        else {
            let missing = [
                (ENV_ACCOUNT_ID, account_id.is_none()),
                (ENV_BUCKET, bucket.is_none()),
                (ENV_ACCESS_KEY_ID, access_key_id.is_none()),
                (ENV_SECRET_ACCESS_KEY, secret_access_key.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect::<Vec<_>>();
            return Err(Error::Validation(format!(
                "R2 configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        };

        let public_base_url = match public_base_url {
            Some(value) if !is_http_url(&value) => {
                return Err(Error::Validation(format!(
                    "{ENV_PUBLIC_BASE_URL} must start with http:// or https://"
                )));
            }
            Some(value) => Some(value.trim_end_matches('/').to_string()),
            None => None,
        };

        Ok(Some(Self {
            account_id,
            bucket,
            access_key_id,
            secret_access_key,
            public_base_url,
        }))
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// [`ObjectStore`] backed by an R2 bucket.
#[derive(Clone, Debug)]
pub struct R2ObjectStore {
    config: R2Config,
    client: Client,
}

impl R2ObjectStore {
    #[must_use]
    pub fn new(config: R2Config) -> Self {
        let client = build_s3_client(&config);
        Self { config, client }
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    /// Check that the configured bucket is reachable with current credentials.
    pub async fn bucket_is_reachable(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|error| storage_error("head_bucket", &self.config.bucket, None, error))?;
        Ok(())
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.config.bucket)
            .prefix(object_key)
            .max_keys(1)
            .send()
            .await
            .map_err(|error| {
                storage_error(
                    "list_objects_v2",
                    &self.config.bucket,
                    Some(object_key),
                    error,
                )
            })?;

        Ok(response
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .any(|candidate| candidate == object_key))
    }

    fn public_object_url(&self, object_key: &str) -> Option<String> {
        let base = self.config.public_base_url.as_ref()?;
        Some(format!("{base}/{object_key}"))
    }
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<()> {
        let object_key = normalize_object_key(key)?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes.to_vec()));

        if let Some(content_type) = content_type.map(str::trim).filter(|value| !value.is_empty()) {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|error| {
            storage_error("put_object", &self.config.bucket, Some(&object_key), error)
        })?;

        tracing::debug!(key = %object_key, size = bytes.len(), "Uploaded object to R2");
        Ok(())
    }

    async fn resolve_url(&self, key: &str) -> Result<String> {
        let object_key = normalize_object_key(key)?;
        if let Some(url) = self.public_object_url(&object_key) {
            return Ok(url);
        }

        if !self.object_exists(&object_key).await? {
            return Err(Error::NotFound(object_key));
        }

        tracing::warn!(
            key = %object_key,
            "{ENV_PUBLIC_BASE_URL} is not set; handing out an expiring presigned URL"
        );
        let presigning = PresigningConfig::expires_in(PRESIGNED_URL_TTL)
            .map_err(|error| {
                storage_error("presign", &self.config.bucket, Some(&object_key), error)
            })?;
        let request = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .presigned(presigning)
            .await
            .map_err(|error| {
                storage_error("presign", &self.config.bucket, Some(&object_key), error)
            })?;
        Ok(request.uri().to_string())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let object_key = normalize_object_key(key)?;
        if !self.object_exists(&object_key).await? {
            return Err(Error::NotFound(object_key));
        }

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|error| {
                storage_error(
                    "delete_object",
                    &self.config.bucket,
                    Some(&object_key),
                    error,
                )
            })?;

        Ok(())
    }
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "keepsake-r2-object-store",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    Error::Storage(format!("R2 {operation} failed for {target}: {error}"))
}
