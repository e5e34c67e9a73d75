//! Blob store client.
//!
//! Objects are addressed by string keys (`thumbnail/<id>.jpg`, ...). The store
//! turns a key into a URL that crawlers can read, accepts uploads, and reads
//! back the content behind the URLs it issued.

pub mod gcs;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;

use crate::config::{Config, StorageBackend};

pub use gcs::GcsStore;
pub use memory::MemoryStore;

/// Errors that can occur during blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The referenced object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The storage service failed or could not be reached.
    #[error("upstream storage error: {0}")]
    Upstream(String),

    /// A URL could not be built or was not issued by this store.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The storage client could not sign a read URL.
    #[error("url signing failed: {0}")]
    Signing(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Key/value object storage that hands out readable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Resolve `key` to a URL valid for reading the object.
    ///
    /// Fails with [`StorageError::NotFound`] if the object is absent.
    async fn read_url(&self, key: &str) -> Result<Url, StorageError>;

    /// Store `data` under `key`, overwriting any existing object, and return
    /// its read URL.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<Url, StorageError>;

    /// Download the content behind a read URL.
    async fn fetch(&self, url: &Url) -> Result<Bytes, StorageError>;
}

/// Build the blob store selected by the configuration.
pub async fn from_config(
    config: &Config,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match &config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory blob store; uploads are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Gcs(gcs) => {
            Arc::new(GcsStore::connect(gcs.clone(), config.url_expiry, http).await?)
        }
    };

    Ok(store)
}
