//! Storage Backends
//!
//! Every storage medium implements [`StorageBackend`]: memory, filesystem, and
//! a remote key-value store.

mod events;
mod filesystem;
mod memory;
mod remote;

#[cfg(feature = "redis")]
mod redis_client;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::cache::{CacheEntry, IndexRecord, StoreReceipt};
use crate::error::Result;

pub use events::{CacheEvent, EventBus};
pub use filesystem::{FsBackend, FsOptions};
pub use memory::MemoryBackend;
pub use remote::{KeyValueClient, RemoteBackend, EXPIRE_FIELD, RESPONSE_FIELD};

#[cfg(feature = "redis")]
pub use redis_client::RedisClient;

// == Backend Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Filesystem,
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Filesystem => "filesystem",
            BackendKind::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Storage Backend ==
/// Key to content storage with its own notion of expiry.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Looks up a key. A missing or expired key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Stores content for `ttl_ms` milliseconds.
    ///
    /// A `ttl_ms` of zero or less stores nothing and removes any previous
    /// entry for the key.
    async fn set(&self, key: &str, content: Bytes, ttl_ms: i64) -> Result<StoreReceipt>;

    /// Removes a key. Absent keys and storage failures are not reported.
    async fn delete(&self, key: &str);

    /// Removes exactly the given keys and nothing else.
    async fn clear(&self, keys: &[String]);

    fn backend_type(&self) -> BackendKind;

    fn events(&self) -> &EventBus;

    /// Records still valid in durable storage from a previous run.
    async fn resume(&self) -> Result<Vec<IndexRecord>> {
        Ok(Vec::new())
    }
}
