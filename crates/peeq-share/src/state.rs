//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::storage::{self, BlobStore};

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Blob store holding source images, the badge and composites.
    pub store: Arc<dyn BlobStore>,
}

impl AppState {
    /// Create application state, building the storage client from configuration.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("peeq-share/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let store = storage::from_config(&config, http).await?;

        tracing::info!(
            http_timeout_secs = config.http_timeout.as_secs(),
            "application state initialized"
        );

        Ok(Self::with_store(config, store))
    }

    /// Create application state around an existing store.
    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
