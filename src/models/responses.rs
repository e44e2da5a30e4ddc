//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::backend::BackendKind;
use crate::cache::CacheStats;

/// Response body for PUT /entry/:key
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    /// The key that was stored
    pub key: String,
    /// Resolved duration in milliseconds
    pub duration_ms: i64,
    /// Group the key was filed under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl StoreResponse {
    pub fn new(key: impl Into<String>, duration_ms: i64, group: Option<String>) -> Self {
        Self {
            key: key.into(),
            duration_ms,
            group,
        }
    }
}

/// Response body for DELETE /clear and DELETE /clear/:target
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// Number of indexed keys removed
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(target: Option<&str>, removed: usize) -> Self {
        let message = match target {
            Some(target) => format!("Cleared '{}'", target),
            None => "Cleared all entries".to_string(),
        };
        Self { message, removed }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cache instance id
    pub cache: usize,
    /// Storage backend in use
    pub backend: BackendKind,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub invalidations: u64,
    pub expirations: u64,
    /// Current number of indexed keys
    pub total_keys: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(cache: usize, backend: BackendKind, stats: &CacheStats) -> Self {
        Self {
            cache,
            backend,
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            invalidations: stats.invalidations,
            expirations: stats.expirations,
            total_keys: stats.total_keys,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
