//! Configuration Module
//!
//! Handles loading the cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::backend::{BackendKind, FsBackend, FsOptions, MemoryBackend, StorageBackend};
use crate::cache::{CacheOptions, DurationSpec, StatusCodes, DEFAULT_DURATION_MS};
use crate::error::{CacheError, Result};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fallback duration in milliseconds for unparseable duration strings
    pub default_duration_ms: i64,
    /// Status codes allowed to be cached (empty means all)
    pub status_include: Vec<u16>,
    /// Status codes never cached
    pub status_exclude: Vec<u16>,
    /// Which storage backend to build
    pub backend: BackendKind,
    /// Directory for the filesystem backend
    pub cache_dir: Option<PathBuf>,
    /// Restore filesystem entries left by a previous run
    pub resume: bool,
    /// Log cache operations at info level
    pub debug: bool,
    /// Connection URL for the remote backend
    pub redis_url: Option<String>,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_DURATION` - Milliseconds or a string like "1 hour" (default: 3600000)
    /// - `STATUS_INCLUDE` - Comma-separated cacheable status codes (default: all)
    /// - `STATUS_EXCLUDE` - Comma-separated status codes never cached (default: none)
    /// - `CACHE_BACKEND` - `memory`, `filesystem` or `remote` (default: memory)
    /// - `CACHE_DIR` - Directory for the filesystem backend
    /// - `CACHE_RESUME` - Restore filesystem entries on startup (default: false)
    /// - `CACHE_DEBUG` - Verbose cache logging (default: false)
    /// - `REDIS_URL` - Remote backend URL
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            default_duration_ms: lookup("DEFAULT_DURATION")
                .map(|v| parse_default_duration(&v))
                .unwrap_or(defaults.default_duration_ms),
            status_include: lookup("STATUS_INCLUDE")
                .map(|v| parse_status_list(&v))
                .unwrap_or_default(),
            status_exclude: lookup("STATUS_EXCLUDE")
                .map(|v| parse_status_list(&v))
                .unwrap_or_default(),
            backend: lookup("CACHE_BACKEND")
                .map(|v| parse_backend(&v))
                .unwrap_or(defaults.backend),
            cache_dir: lookup("CACHE_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            resume: lookup("CACHE_RESUME")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.resume),
            debug: lookup("CACHE_DEBUG")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.debug),
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }

    /// Options for the cache facade.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            default_duration_ms: self.default_duration_ms,
            status_codes: StatusCodes::new(
                self.status_include.clone(),
                self.status_exclude.clone(),
            ),
            debug: self.debug,
        }
    }

    /// Constructs the configured storage backend.
    ///
    /// # Errors
    /// `CacheError::Config` if the backend is missing a required setting.
    pub async fn build_backend(&self) -> Result<Arc<dyn StorageBackend>> {
        match self.backend {
            BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
            BackendKind::Filesystem => {
                let dir = self.cache_dir.clone().ok_or_else(|| {
                    CacheError::Config("filesystem backend requires CACHE_DIR".to_string())
                })?;
                let backend = FsBackend::open(FsOptions::new(dir).with_resume(self.resume)).await?;
                Ok(Arc::new(backend))
            }
            BackendKind::Remote => self.build_remote().await,
        }
    }

    #[cfg(feature = "redis")]
    async fn build_remote(&self) -> Result<Arc<dyn StorageBackend>> {
        use crate::backend::{RedisClient, RemoteBackend};

        let client = match &self.redis_url {
            Some(url) => Some(RedisClient::connect(url).await?),
            None => None,
        };
        Ok(Arc::new(RemoteBackend::from_handle(client)?))
    }

    #[cfg(not(feature = "redis"))]
    async fn build_remote(&self) -> Result<Arc<dyn StorageBackend>> {
        Err(CacheError::Config(
            "remote backend requires the `redis` feature".to_string(),
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_DURATION_MS,
            status_include: Vec::new(),
            status_exclude: Vec::new(),
            backend: BackendKind::Memory,
            cache_dir: None,
            resume: false,
            debug: false,
            redis_url: None,
            server_port: 3000,
        }
    }
}

fn parse_default_duration(value: &str) -> i64 {
    let value = value.trim();
    let spec = match value.parse::<i64>() {
        Ok(ms) => DurationSpec::Millis(ms),
        Err(_) => DurationSpec::from(value),
    };
    spec.to_millis(DEFAULT_DURATION_MS)
}

fn parse_status_list(value: &str) -> Vec<u16> {
    value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .filter_map(|code| match code.parse() {
            Ok(code) => Some(code),
            Err(_) => {
                warn!(code, "Ignoring invalid status code");
                None
            }
        })
        .collect()
}

fn parse_backend(value: &str) -> BackendKind {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => BackendKind::Memory,
        "filesystem" | "fs" => BackendKind::Filesystem,
        "remote" | "redis" => BackendKind::Remote,
        other => {
            warn!(backend = other, "Unknown CACHE_BACKEND, using memory");
            BackendKind::Memory
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
