//! Google Cloud Storage backend.
//!
//! Object reads and writes go through the `google-cloud-storage` client, which
//! handles Application Default Credentials and token refresh. Permanent read
//! URLs use Firebase download tokens stored in object metadata; expiring read
//! URLs are V4 signed by the client with the service account's credentials.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::Error as GcsError;
use google_cloud_storage::http::objects::Object;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::patch::PatchObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use google_cloud_storage::sign::{SignedURLMethod, SignedURLOptions};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{StatusCode, Url};

use super::{BlobStore, StorageError};
use crate::config::{GcsConfig, UrlExpiry};

/// Object metadata key holding comma-separated download tokens.
const DOWNLOAD_TOKENS_KEY: &str = "firebaseStorageDownloadTokens";

/// Everything but RFC 3986 unreserved characters, so `/` in keys is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn download_token(object: &Object) -> Option<&str> {
    object
        .metadata
        .as_ref()?
        .get(DOWNLOAD_TOKENS_KEY)?
        .split(',')
        .map(str::trim)
        .find(|t| !t.is_empty())
}

fn classify(err: GcsError, key: &str) -> StorageError {
    match err {
        GcsError::Response(response) if response.code == 404 => {
            StorageError::NotFound(key.to_string())
        }
        other => StorageError::Upstream(format!("cloud storage request for {key} failed: {other}")),
    }
}

/// Blob store backed by a Cloud Storage bucket.
#[derive(Clone)]
pub struct GcsStore {
    client: Client,
    http: reqwest::Client,
    config: GcsConfig,
    expiry: UrlExpiry,
}

impl std::fmt::Debug for GcsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsStore")
            .field("config", &self.config)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl GcsStore {
    /// Build a store authenticated with Application Default Credentials, or
    /// anonymously when configured for an emulator.
    pub async fn connect(
        config: GcsConfig,
        expiry: UrlExpiry,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let client_config = if config.anonymous {
            ClientConfig::default().anonymous()
        } else {
            ClientConfig::default().with_auth().await?
        };
        Self::new(client_config, config, expiry, http)
    }

    /// Build a store from an already prepared client configuration.
    pub fn new(
        mut client_config: ClientConfig,
        config: GcsConfig,
        expiry: UrlExpiry,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        Url::parse(&config.api_url)
            .map_err(|e| anyhow::anyhow!("invalid PEEQ_GCS_API_URL {:?}: {e}", config.api_url))?;
        Url::parse(&config.download_url).map_err(|e| {
            anyhow::anyhow!("invalid PEEQ_GCS_DOWNLOAD_URL {:?}: {e}", config.download_url)
        })?;

        client_config.storage_endpoint = config.api_url.clone();

        tracing::info!(
            bucket = %config.bucket,
            api_url = %config.api_url,
            anonymous = config.anonymous,
            expiry = ?expiry,
            "cloud storage client ready"
        );

        Ok(Self {
            client: Client::new(client_config),
            http,
            config,
            expiry,
        })
    }

    async fn object_metadata(&self, key: &str) -> Result<Object, StorageError> {
        self.client
            .get_object(&GetObjectRequest {
                bucket: self.config.bucket.clone(),
                object: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| classify(e, key))
    }

    /// Return the object's download token, creating one if it has none.
    async fn ensure_download_token(&self, key: &str, object: &Object) -> Result<String, StorageError> {
        if let Some(token) = download_token(object) {
            return Ok(token.to_string());
        }

        let token = uuid::Uuid::new_v4().to_string();
        let request = PatchObjectRequest {
            bucket: self.config.bucket.clone(),
            object: key.to_string(),
            metadata: Some(Object {
                metadata: Some(HashMap::from([(
                    DOWNLOAD_TOKENS_KEY.to_string(),
                    token.clone(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.client
            .patch_object(&request)
            .await
            .map_err(|e| classify(e, key))?;

        tracing::debug!(key = %key, "created download token");
        Ok(token)
    }

    fn download_url(&self, key: &str, token: &str) -> Result<Url, StorageError> {
        let raw = format!(
            "{}/v0/b/{}/o/{}?alt=media&token={}",
            self.config.download_url,
            utf8_percent_encode(&self.config.bucket, UNRESERVED),
            utf8_percent_encode(key, UNRESERVED),
            utf8_percent_encode(token, UNRESERVED)
        );
        Url::parse(&raw).map_err(|e| StorageError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn issue_url(&self, key: &str, object: &Object) -> Result<Url, StorageError> {
        match self.expiry {
            UrlExpiry::Permanent => {
                let token = self.ensure_download_token(key, object).await?;
                self.download_url(key, &token)
            }
            UrlExpiry::Duration(ttl) => {
                let options = SignedURLOptions {
                    method: SignedURLMethod::GET,
                    expires: ttl,
                    ..Default::default()
                };
                let signed = self
                    .client
                    .signed_url(&self.config.bucket, key, None, None, options)
                    .await
                    .map_err(|e| StorageError::Signing(format!("{key}: {e}")))?;
                Url::parse(&signed).map_err(|e| StorageError::InvalidUrl(format!("{signed}: {e}")))
            }
        }
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    async fn read_url(&self, key: &str) -> Result<Url, StorageError> {
        let object = self.object_metadata(key).await?;
        self.issue_url(key, &object).await
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<Url, StorageError> {
        let size = data.len();

        let mut media = Media::new(key.to_string());
        media.content_type = content_type.to_string().into();

        let request = UploadObjectRequest {
            bucket: self.config.bucket.clone(),
            ..Default::default()
        };
        let object = self
            .client
            .upload_object(&request, data, &UploadType::Simple(media))
            .await
            .map_err(|e| classify(e, key))?;

        tracing::debug!(key = %key, size, content_type = %content_type, "object uploaded");
        self.issue_url(key, &object).await
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, StorageError> {
        let limit = self.config.max_fetch_bytes;
        let too_large = || {
            StorageError::Upstream(format!("{} exceeds the {limit} byte fetch limit", url.path()))
        };

        // Read URLs carry their own credentials.
        let mut response = self.http.get(url.clone()).send().await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::NotFound(url.path().to_string())),
            status => {
                return Err(StorageError::Upstream(format!(
                    "fetching {} returned {status}",
                    url.path()
                )));
            }
        }

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}
