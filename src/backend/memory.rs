//! In-memory backend.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{BackendKind, EventBus, StorageBackend};
use crate::cache::{current_timestamp_ms, CacheEntry, StoreReceipt};
use crate::error::Result;

// == Memory Backend ==
/// Volatile storage in a HashMap. The locator of an entry is its key.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, CacheEntry>>,
    events: EventBus,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are deleted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entry = {
            let entries = self.entries.read().await;
            entries.get(key).filter(|e| !e.is_expired()).cloned()
        };
        self.events.read(key);
        Ok(entry)
    }

    async fn set(&self, key: &str, content: Bytes, ttl_ms: i64) -> Result<StoreReceipt> {
        if ttl_ms <= 0 {
            debug!(key, ttl_ms, "memory: non-positive ttl, not storing");
            self.entries.write().await.remove(key);
            return Ok(StoreReceipt {
                locator: key.to_string(),
                expire_at: current_timestamp_ms(),
            });
        }

        let entry = CacheEntry::new(content, ttl_ms);
        let receipt = StoreReceipt {
            locator: key.to_string(),
            expire_at: entry.expire_at,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        self.events.save(key);
        Ok(receipt)
    }

    async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
        self.events.expire(key);
    }

    async fn clear(&self, keys: &[String]) {
        {
            let mut entries = self.entries.write().await;
            for key in keys {
                entries.remove(key);
            }
        }
        self.events.clear();
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
