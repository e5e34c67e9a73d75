//! In-process blob store.
//!
//! Read URLs take the form `memory://blobs/<key>` and only resolve through the
//! same store instance. Used for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use reqwest::Url;

use super::{BlobStore, StorageError};

const URL_SCHEME: &str = "memory";
const URL_HOST: &str = "blobs";

/// Characters escaped in key paths. `/` stays literal so keys read naturally.
const KEY_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Blob store backed by a map in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>, content_type: &str) {
        self.objects.write().insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    /// Raw bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.data.clone())
    }

    /// Content type stored under `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.read().get(key).map(|o| o.content_type.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Make every `read_url` call fail with an upstream error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn url_for(key: &str) -> Result<Url, StorageError> {
        let raw = format!(
            "{URL_SCHEME}://{URL_HOST}/{}",
            utf8_percent_encode(key, KEY_PATH)
        );
        Url::parse(&raw).map_err(|e| StorageError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn key_for(url: &Url) -> Result<String, StorageError> {
        if url.scheme() != URL_SCHEME || url.host_str() != Some(URL_HOST) {
            return Err(StorageError::InvalidUrl(url.to_string()));
        }

        let path = url.path().trim_start_matches('/');
        percent_decode_str(path)
            .decode_utf8()
            .map(|key| key.into_owned())
            .map_err(|_| StorageError::InvalidUrl(url.to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn read_url(&self, key: &str) -> Result<Url, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Upstream("injected read failure".to_string()));
        }
        if !self.contains(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Self::url_for(key)
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<Url, StorageError> {
        self.insert(key, data, content_type);
        Self::url_for(key)
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, StorageError> {
        let key = Self::key_for(url)?;
        self.get(&key).ok_or(StorageError::NotFound(key))
    }
}
