//! Remote key-value backend.
//!
//! Each entry is a hash with a `response` field holding the content and an
//! `expire` field holding the absolute expiry in Unix milliseconds. The remote
//! store is also told to expire the key on its own, so the local scheduler is
//! only bookkeeping here.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::backend::{BackendKind, EventBus, StorageBackend};
use crate::cache::{current_timestamp_ms, is_past, CacheEntry, StoreReceipt};
use crate::error::{CacheError, Result};
use crate::tasks::MAX_TIMER_DELAY;

pub const RESPONSE_FIELD: &str = "response";
pub const EXPIRE_FIELD: &str = "expire";

/// Longest lifetime handed to the remote store, matching the local timer cap.
const MAX_REMOTE_TTL_MS: i64 = MAX_TIMER_DELAY.as_millis() as i64;

// == Key-Value Client ==
/// The handful of remote commands the backend needs.
#[async_trait]
pub trait KeyValueClient: Send + Sync {
    /// Sets several hash fields of `key` at once.
    async fn hset_multiple(&self, key: &str, fields: &[(&str, Vec<u8>)]) -> Result<()>;

    /// Reads every field of `key`; an absent key is an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>>;

    /// Asks the store to drop `key` after `ttl_ms` milliseconds.
    async fn pexpire(&self, key: &str, ttl_ms: i64) -> Result<()>;

    async fn del(&self, keys: &[String]) -> Result<()>;
}

// == Remote Backend ==
pub struct RemoteBackend<C> {
    client: C,
    events: EventBus,
}

impl<C: KeyValueClient> RemoteBackend<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            events: EventBus::new(),
        }
    }

    /// Builds the backend from an optional client handle.
    pub fn from_handle(client: Option<C>) -> Result<Self> {
        client
            .map(Self::new)
            .ok_or_else(|| CacheError::Config("remote backend requires a client".to_string()))
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: KeyValueClient> StorageBackend for RemoteBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut fields = self.client.hgetall(key).await?;
        self.events.read(key);

        if fields.is_empty() {
            return Ok(None);
        }

        let expire_at = fields
            .get(EXPIRE_FIELD)
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .and_then(|raw| raw.parse::<i64>().ok());

        match expire_at {
            Some(expire_at) if is_past(expire_at) => Ok(None),
            Some(expire_at) => Ok(Some(CacheEntry {
                content: fields.remove(RESPONSE_FIELD).map(Bytes::from),
                expire_at,
            })),
            // Written by something else or corrupted: present, but unusable.
            None => {
                warn!(key, "remote: entry without a readable expire field");
                Ok(Some(CacheEntry {
                    content: None,
                    expire_at: 0,
                }))
            }
        }
    }

    async fn set(&self, key: &str, content: Bytes, ttl_ms: i64) -> Result<StoreReceipt> {
        if ttl_ms <= 0 {
            debug!(key, ttl_ms, "remote: non-positive ttl, not storing");
            self.client.del(&[key.to_string()]).await?;
            return Ok(StoreReceipt {
                locator: key.to_string(),
                expire_at: current_timestamp_ms(),
            });
        }

        let ttl_ms = ttl_ms.min(MAX_REMOTE_TTL_MS);
        let expire_at = current_timestamp_ms() + ttl_ms;
        self.client
            .hset_multiple(
                key,
                &[
                    (RESPONSE_FIELD, content.to_vec()),
                    (EXPIRE_FIELD, expire_at.to_string().into_bytes()),
                ],
            )
            .await?;
        // A hash left without a remote TTL would outlive every local record.
        if let Err(e) = self.client.pexpire(key, ttl_ms).await {
            warn!(key, error = %e, "remote: pexpire failed, dropping entry");
            if let Err(e) = self.client.del(&[key.to_string()]).await {
                warn!(key, error = %e, "remote: cleanup after failed pexpire failed");
            }
            return Err(e);
        }

        self.events.save(key);
        Ok(StoreReceipt {
            locator: key.to_string(),
            expire_at,
        })
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.client.del(&[key.to_string()]).await {
            warn!(key, error = %e, "remote: delete failed");
        }
        self.events.expire(key);
    }

    async fn clear(&self, keys: &[String]) {
        if !keys.is_empty() {
            if let Err(e) = self.client.del(keys).await {
                warn!(count = keys.len(), error = %e, "remote: clear failed");
            }
        }
        self.events.clear();
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
