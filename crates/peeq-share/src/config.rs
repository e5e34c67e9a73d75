//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::auth::AuthPolicy;

/// Longest lifetime Cloud Storage accepts for a V4 signed URL.
pub const MAX_SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Lifetime of the read URLs handed out by the blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlExpiry {
    /// Download-token URLs that never expire. Link-preview crawlers re-fetch
    /// images at arbitrary times, so this is the default.
    #[default]
    Permanent,
    /// V4 signed URLs valid for the given duration.
    Duration(Duration),
}

impl UrlExpiry {
    /// Parse `permanent` or a number of seconds.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("permanent") {
            return Ok(Self::Permanent);
        }

        let secs: u64 = raw
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid url expiry {raw:?}: expected 'permanent' or seconds"))?;
        let ttl = Duration::from_secs(secs);
        if ttl.is_zero() || ttl > MAX_SIGNED_URL_TTL {
            anyhow::bail!(
                "url expiry of {secs}s is out of range (1..={})",
                MAX_SIGNED_URL_TTL.as_secs()
            );
        }

        Ok(Self::Duration(ttl))
    }
}

/// Largest object body the service will download (10 MiB).
pub const DEFAULT_MAX_FETCH_BYTES: usize = 10 * 1024 * 1024;

/// Google Cloud Storage settings.
///
/// Credentials come from Application Default Credentials, not from here.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    /// Bucket holding every object this service reads and writes.
    pub bucket: String,
    /// JSON API origin (overridable for emulators).
    pub api_url: String,
    /// Origin of permanent download-token URLs.
    pub download_url: String,
    /// Skip credential discovery. Only useful against an emulator.
    pub anonymous: bool,
    /// Fetches of larger bodies fail instead of being buffered.
    pub max_fetch_bytes: usize,
}

/// Which blob store backend to use.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-process store, for local development.
    Memory,
    /// Google Cloud Storage.
    Gcs(GcsConfig),
}

impl StorageBackend {
    /// Short name for logs and the health check.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Gcs(_) => "gcs",
        }
    }
}

/// Analytics constants embedded in the client bootstrap script.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfig {
    pub api_key: String,
    pub project_id: String,
    pub app_id: String,
    pub measurement_id: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// Public base URL of this service, used for `og:url`.
    pub base_url: String,

    /// Site name shown in OG tags and page titles.
    pub site_name: String,

    /// Description shown in OG tags.
    pub site_description: String,

    /// Blob store backend.
    pub storage: StorageBackend,

    /// Lifetime of issued read URLs.
    pub url_expiry: UrlExpiry,

    /// Timeout applied to fetches of read URLs.
    pub http_timeout: Duration,

    /// Directory holding the pre-built client application, served at `/`.
    pub static_dir: Option<PathBuf>,

    /// URL path of the client bundle entry script.
    pub bundle_path: String,

    /// Analytics constants for the client bootstrap.
    pub analytics: AnalyticsConfig,

    /// Authorization applied to share routes.
    pub auth: AuthPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            base_url: "http://localhost:8080".to_string(),
            site_name: "Peeq".to_string(),
            site_description: "Watch this on Peeq".to_string(),
            storage: StorageBackend::Memory,
            url_expiry: UrlExpiry::Permanent,
            http_timeout: Duration::from_secs(10),
            static_dir: None,
            bundle_path: "/static/js/main.js".to_string(),
            analytics: AnalyticsConfig::default(),
            auth: AuthPolicy::Open,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (defaults suit local development with the memory store):
    /// - `PEEQ_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `PEEQ_BASE_URL`: Public base URL for `og:url` (default: "http://localhost:8080")
    /// - `PEEQ_SITE_NAME` / `PEEQ_SITE_DESCRIPTION`: OG title and description
    /// - `PEEQ_STORAGE`: `memory` (default) or `gcs`
    /// - `PEEQ_GCS_BUCKET`: Bucket name (required for `gcs`)
    /// - `PEEQ_GCS_API_URL`: API origin (default: "https://storage.googleapis.com")
    /// - `PEEQ_GCS_DOWNLOAD_URL`: Download origin (default: "https://firebasestorage.googleapis.com")
    /// - `PEEQ_GCS_ANONYMOUS`: `true` to skip credentials (emulators only)
    /// - `PEEQ_GCS_MAX_FETCH_BYTES`: Largest object body fetched (default: 10 MiB)
    /// - `PEEQ_URL_EXPIRY`: `permanent` (default) or a lifetime in seconds
    /// - `PEEQ_HTTP_TIMEOUT_SECS`: Outbound request timeout (default: 10)
    /// - `PEEQ_STATIC_DIR`: Client application directory
    /// - `PEEQ_BUNDLE_PATH`: Client bundle script path (default: "/static/js/main.js")
    /// - `PEEQ_ANALYTICS_*`: `API_KEY`, `PROJECT_ID`, `APP_ID`, `MEASUREMENT_ID`
    /// - `PEEQ_AUTH_TOKENS`: Comma-separated bearer tokens; enables auth when non-empty
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = env_or("PEEQ_BIND_ADDR", defaults.bind_addr);

        let base_url = env_or("PEEQ_BASE_URL", defaults.base_url)
            .trim_end_matches('/')
            .to_string();

        let site_name = env_or("PEEQ_SITE_NAME", defaults.site_name);
        let site_description = env_or("PEEQ_SITE_DESCRIPTION", defaults.site_description);

        let url_expiry = UrlExpiry::parse(&std::env::var("PEEQ_URL_EXPIRY").unwrap_or_default())?;

        let storage = match std::env::var("PEEQ_STORAGE")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "gcs" => StorageBackend::Gcs(gcs_from_env()?),
            other => anyhow::bail!("unknown PEEQ_STORAGE backend {other:?} (expected memory or gcs)"),
        };

        let http_timeout = match std::env::var("PEEQ_HTTP_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid PEEQ_HTTP_TIMEOUT_SECS {raw:?}"))?,
            ),
            Err(_) => defaults.http_timeout,
        };

        let static_dir = std::env::var("PEEQ_STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let bundle_path = env_or("PEEQ_BUNDLE_PATH", defaults.bundle_path);

        let analytics = AnalyticsConfig {
            api_key: std::env::var("PEEQ_ANALYTICS_API_KEY").unwrap_or_default(),
            project_id: std::env::var("PEEQ_ANALYTICS_PROJECT_ID").unwrap_or_default(),
            app_id: std::env::var("PEEQ_ANALYTICS_APP_ID").unwrap_or_default(),
            measurement_id: std::env::var("PEEQ_ANALYTICS_MEASUREMENT_ID").unwrap_or_default(),
        };

        let auth = AuthPolicy::from_tokens(
            std::env::var("PEEQ_AUTH_TOKENS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim),
        );

        tracing::info!(
            bind_addr = %bind_addr,
            base_url = %base_url,
            site_name = %site_name,
            storage = ?storage,
            url_expiry = ?url_expiry,
            static_dir = ?static_dir,
            auth = auth.name(),
            "share configuration loaded"
        );

        Ok(Self {
            bind_addr,
            base_url,
            site_name,
            site_description,
            storage,
            url_expiry,
            http_timeout,
            static_dir,
            bundle_path,
            analytics,
            auth,
        })
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn gcs_from_env() -> anyhow::Result<GcsConfig> {
    let bucket = std::env::var("PEEQ_GCS_BUCKET")
        .map_err(|_| anyhow::anyhow!("PEEQ_GCS_BUCKET is required when PEEQ_STORAGE=gcs"))?;

    let api_url = env_or("PEEQ_GCS_API_URL", "https://storage.googleapis.com".to_string())
        .trim_end_matches('/')
        .to_string();
    let download_url = env_or(
        "PEEQ_GCS_DOWNLOAD_URL",
        "https://firebasestorage.googleapis.com".to_string(),
    )
    .trim_end_matches('/')
    .to_string();

    let anonymous = std::env::var("PEEQ_GCS_ANONYMOUS")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let max_fetch_bytes = match std::env::var("PEEQ_GCS_MAX_FETCH_BYTES") {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow::anyhow!("invalid PEEQ_GCS_MAX_FETCH_BYTES {raw:?}"))?,
        Err(_) => DEFAULT_MAX_FETCH_BYTES,
    };

    Ok(GcsConfig {
        bucket,
        api_url,
        download_url,
        anonymous,
        max_fetch_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize config tests that manipulate env vars.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "PEEQ_BIND_ADDR",
        "PEEQ_BASE_URL",
        "PEEQ_SITE_NAME",
        "PEEQ_SITE_DESCRIPTION",
        "PEEQ_STORAGE",
        "PEEQ_GCS_BUCKET",
        "PEEQ_GCS_API_URL",
        "PEEQ_GCS_DOWNLOAD_URL",
        "PEEQ_GCS_ANONYMOUS",
        "PEEQ_GCS_MAX_FETCH_BYTES",
        "PEEQ_URL_EXPIRY",
        "PEEQ_HTTP_TIMEOUT_SECS",
        "PEEQ_STATIC_DIR",
        "PEEQ_BUNDLE_PATH",
        "PEEQ_ANALYTICS_API_KEY",
        "PEEQ_ANALYTICS_PROJECT_ID",
        "PEEQ_ANALYTICS_APP_ID",
        "PEEQ_ANALYTICS_MEASUREMENT_ID",
        "PEEQ_AUTH_TOKENS",
    ];

    /// Run `f` with exactly `vars` set among the keys this module reads.
    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: Serialized by mutex; only test code touches these vars.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: Restoring original env state.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn config_defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:8080");
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.site_name, "Peeq");
            assert!(matches!(config.storage, StorageBackend::Memory));
            assert_eq!(config.url_expiry, UrlExpiry::Permanent);
            assert_eq!(config.http_timeout, Duration::from_secs(10));
            assert!(config.static_dir.is_none());
            assert_eq!(config.bundle_path, "/static/js/main.js");
            assert!(matches!(config.auth, AuthPolicy::Open));
        });
    }

    #[test]
    fn config_base_url_trailing_slash_stripped() {
        with_env_vars(&[("PEEQ_BASE_URL", "https://peeq.app/")], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.base_url, "https://peeq.app");
        });
    }

    #[test]
    fn config_gcs_backend() {
        with_env_vars(
            &[
                ("PEEQ_STORAGE", "gcs"),
                ("PEEQ_GCS_BUCKET", "peeq-media"),
                ("PEEQ_GCS_API_URL", "http://localhost:4443/"),
                ("PEEQ_GCS_ANONYMOUS", "true"),
            ],
            || {
                let config = Config::from_env().unwrap();
                let StorageBackend::Gcs(gcs) = config.storage else {
                    panic!("expected gcs backend");
                };
                assert_eq!(gcs.bucket, "peeq-media");
                assert_eq!(gcs.api_url, "http://localhost:4443");
                assert_eq!(gcs.download_url, "https://firebasestorage.googleapis.com");
                assert!(gcs.anonymous);
                assert_eq!(gcs.max_fetch_bytes, DEFAULT_MAX_FETCH_BYTES);
            },
        );
    }

    #[test]
    fn config_gcs_requires_bucket() {
        with_env_vars(&[("PEEQ_STORAGE", "gcs")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn config_unknown_backend_rejected() {
        with_env_vars(&[("PEEQ_STORAGE", "s3")], || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn config_gcs_fetch_limit_and_expiry() {
        with_env_vars(
            &[
                ("PEEQ_STORAGE", "gcs"),
                ("PEEQ_GCS_BUCKET", "peeq-media"),
                ("PEEQ_GCS_MAX_FETCH_BYTES", "2048"),
                ("PEEQ_URL_EXPIRY", "3600"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(
                    config.url_expiry,
                    UrlExpiry::Duration(Duration::from_secs(3600))
                );
                let StorageBackend::Gcs(gcs) = config.storage else {
                    panic!("expected gcs backend");
                };
                assert!(!gcs.anonymous);
                assert_eq!(gcs.max_fetch_bytes, 2048);
            },
        );

        with_env_vars(
            &[
                ("PEEQ_STORAGE", "gcs"),
                ("PEEQ_GCS_BUCKET", "peeq-media"),
                ("PEEQ_GCS_MAX_FETCH_BYTES", "0"),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn config_auth_tokens_enable_bearer_policy() {
        with_env_vars(&[("PEEQ_AUTH_TOKENS", "abc, def,,")], || {
            let config = Config::from_env().unwrap();
            let AuthPolicy::BearerToken(tokens) = config.auth else {
                panic!("expected bearer policy");
            };
            assert_eq!(tokens.len(), 2);
            assert!(tokens.contains("abc"));
            assert!(tokens.contains("def"));
        });
    }

    #[test]
    fn url_expiry_parsing() {
        assert_eq!(UrlExpiry::parse("permanent").unwrap(), UrlExpiry::Permanent);
        assert_eq!(UrlExpiry::parse("").unwrap(), UrlExpiry::Permanent);
        assert_eq!(
            UrlExpiry::parse("60").unwrap(),
            UrlExpiry::Duration(Duration::from_secs(60))
        );
        assert!(UrlExpiry::parse("0").is_err());
        assert!(UrlExpiry::parse("604801").is_err());
        assert!(UrlExpiry::parse("forever").is_err());
    }
}
