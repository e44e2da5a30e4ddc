//! Cache Facade
//!
//! Combines a storage backend, the key/group index, and the expiry scheduler
//! behind one handle.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::{BackendKind, CacheEvent, StorageBackend};
use crate::cache::{
    CacheEntry, CacheStats, DurationSpec, GlobalIndex, IndexRecord, IndexSnapshot,
    ResponseDescriptor, StatusCodes,
};
use crate::error::Result;
use crate::tasks::{spawn_expiry_task, ExpiryHandler, ExpiryScheduler};

/// One hour, used when a duration string cannot be parsed.
pub const DEFAULT_DURATION_MS: i64 = 3_600_000;

// == Options ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Fallback for unparseable duration strings
    pub default_duration_ms: i64,
    /// Which response status codes may be cached
    pub status_codes: StatusCodes,
    /// Log every cache operation at info level instead of debug
    pub debug: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_DURATION_MS,
            status_codes: StatusCodes::default(),
            debug: false,
        }
    }
}

// == Index Listing ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexListing {
    All(IndexSnapshot),
    Group(Vec<String>),
    NotFound,
}

// == Cache ==
/// Cheaply clonable handle; clones share the same cache.
///
/// Construction spawns the expiry task, so it must happen inside a Tokio
/// runtime. The task stops when the last handle is dropped.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<Inner>,
}

struct Inner {
    id: usize,
    backend: Arc<dyn StorageBackend>,
    index: RwLock<GlobalIndex>,
    scheduler: Arc<ExpiryScheduler>,
    stats: RwLock<CacheStats>,
    options: CacheOptions,
    expiry_task: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.expiry_task.abort();
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("id", &self.inner.id)
            .field("backend", &self.inner.backend.backend_type())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl Cache {
    // == Constructors ==
    pub fn new(backend: Arc<dyn StorageBackend>, options: CacheOptions) -> Self {
        Self::with_id(0, backend, options)
    }

    /// Creates the cache and restores whatever the backend kept from a
    /// previous run.
    pub async fn open(backend: Arc<dyn StorageBackend>, options: CacheOptions) -> Result<Self> {
        let cache = Self::new(backend, options);
        cache.restore().await?;
        Ok(cache)
    }

    pub(crate) fn with_id(
        id: usize,
        backend: Arc<dyn StorageBackend>,
        options: CacheOptions,
    ) -> Self {
        let scheduler = Arc::new(ExpiryScheduler::new());
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let handler: Weak<dyn ExpiryHandler> = weak.clone();
            Inner {
                id,
                expiry_task: spawn_expiry_task(scheduler.clone(), handler),
                backend,
                index: RwLock::new(GlobalIndex::new()),
                scheduler,
                stats: RwLock::new(CacheStats::new()),
                options,
            }
        });

        info!(
            cache = id,
            backend = %inner.backend.backend_type(),
            "Cache initialized"
        );
        Self { inner }
    }

    // == Restore ==
    /// Registers every record the backend resumed and arms it for its
    /// remaining time. Returns how many keys were restored.
    pub async fn restore(&self) -> Result<usize> {
        let records = self.inner.backend.resume().await?;
        let count = records.len();

        for record in records {
            let remaining = record.ttl_remaining_ms();
            let key = record.key.clone();
            self.inner.index.write().await.register(record);
            self.inner.scheduler.arm(&key, remaining).await;
        }

        if count > 0 {
            info!(cache = self.inner.id, restored = count, "Cache index restored");
        }
        Ok(count)
    }

    // == Fetch ==
    /// Reads a key. `Ok(None)` is a miss.
    pub async fn fetch(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entry = self.inner.backend.get(key).await?;

        let mut stats = self.inner.stats.write().await;
        if entry.is_some() {
            stats.record_hit();
            self.inner.trace(format_args!("hit \"{key}\""));
        } else {
            stats.record_miss();
            self.inner.trace(format_args!("miss \"{key}\""));
        }
        Ok(entry)
    }

    // == Store ==
    /// Stores content under `key` for `duration`, optionally tagged with a
    /// group.
    ///
    /// Content is persisted before the key is indexed, so a failed store
    /// leaves no index record behind. A non-positive duration stores nothing
    /// and drops any previous entry for the key.
    pub async fn store(
        &self,
        key: &str,
        content: impl Into<Bytes>,
        duration: impl Into<DurationSpec>,
        group: Option<&str>,
    ) -> Result<()> {
        let ttl_ms = self.duration(duration);
        let receipt = self.inner.backend.set(key, content.into(), ttl_ms).await?;

        if ttl_ms <= 0 {
            self.inner.scheduler.cancel(key).await;
            self.inner.index.write().await.forget(key);
            self.inner
                .trace(format_args!("not caching \"{key}\": duration {ttl_ms}ms"));
            return Ok(());
        }

        self.inner
            .index
            .write()
            .await
            .register(IndexRecord::from_receipt(key, receipt, group));
        self.inner.scheduler.arm(key, ttl_ms).await;
        self.inner.stats.write().await.record_store();

        match group {
            Some(group) => self.inner.trace(format_args!(
                "added \"{key}\" to group \"{group}\" for {ttl_ms}ms"
            )),
            None => self.inner.trace(format_args!("added \"{key}\" for {ttl_ms}ms")),
        }
        Ok(())
    }

    /// Stores only if the response's status code is cacheable. Returns
    /// whether a store was attempted.
    pub async fn store_response(
        &self,
        response: &impl ResponseDescriptor,
        key: &str,
        content: impl Into<Bytes>,
        duration: impl Into<DurationSpec>,
        group: Option<&str>,
    ) -> Result<bool> {
        let status = response.status();
        if !self.should_cache(status) {
            self.inner
                .trace(format_args!("skipping \"{key}\": status {status} not cacheable"));
            return Ok(false);
        }
        self.store(key, content, duration, group).await?;
        Ok(true)
    }

    // == Invalidate ==
    /// Removes a group, a single key, or (with `None` or an empty name)
    /// everything this cache indexed. A name that is both a group and a key
    /// is treated as a group.
    ///
    /// Backend failures are logged, never returned: the index is updated
    /// regardless. Returns how many indexed keys were removed.
    pub async fn invalidate(&self, target: Option<&str>) -> usize {
        self.inner.stats.write().await.record_invalidation();

        let Some(target) = target.filter(|t| !t.is_empty()) else {
            return self.inner.clear_all().await;
        };

        let is_group = self.inner.index.read().await.has_group(target);
        if is_group {
            self.inner.clear_group(target).await
        } else {
            usize::from(self.inner.clear_entry(target).await)
        }
    }

    // == List ==
    pub async fn list(&self, group: Option<&str>) -> IndexListing {
        let index = self.inner.index.read().await;
        match group {
            None => IndexListing::All(index.snapshot()),
            Some(group) => index
                .keys_of(group)
                .map_or(IndexListing::NotFound, IndexListing::Group),
        }
    }

    // == Policy ==
    pub fn should_cache(&self, status: u16) -> bool {
        self.inner.options.status_codes.admits(status)
    }

    /// Resolves a duration against this cache's default.
    pub fn duration(&self, duration: impl Into<DurationSpec>) -> i64 {
        duration
            .into()
            .to_millis(self.inner.options.default_duration_ms)
    }

    // == Introspection ==
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.backend.events().subscribe()
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.inner.stats.read().await.clone();
        stats.set_total_keys(self.inner.index.read().await.len());
        stats
    }

    pub async fn is_scheduled(&self, key: &str) -> bool {
        self.inner.scheduler.is_armed(key).await
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.inner.backend.clone()
    }

    pub fn backend_type(&self) -> BackendKind {
        self.inner.backend.backend_type()
    }
}

impl Inner {
    fn trace(&self, message: fmt::Arguments<'_>) {
        if self.options.debug {
            info!(cache = self.id, "{}", message);
        } else {
            debug!(cache = self.id, "{}", message);
        }
    }

    /// Shared delete path for explicit invalidation of one key.
    async fn clear_entry(&self, key: &str) -> bool {
        self.trace(format_args!("clearing cached entry for \"{key}\""));
        self.scheduler.cancel(key).await;
        self.backend.delete(key).await;
        self.index.write().await.forget(key).is_some()
    }

    async fn clear_group(&self, group: &str) -> usize {
        self.trace(format_args!("clearing group \"{group}\""));

        // Detach first so keys stored into the group meanwhile are not
        // dropped from the index while their content stays behind.
        let keys = self
            .index
            .write()
            .await
            .drop_group(group)
            .unwrap_or_default();

        self.scheduler.cancel_many(&keys).await;
        join_all(keys.iter().map(|key| self.backend.delete(key))).await;
        keys.len()
    }

    async fn clear_all(&self) -> usize {
        self.trace(format_args!("clearing entire index"));

        let keys = {
            let mut index = self.index.write().await;
            let keys = index.keys();
            index.reset();
            keys
        };

        self.scheduler.cancel_many(&keys).await;
        self.backend.clear(&keys).await;
        keys.len()
    }

    /// Fired by the scheduler. Re-arms instead of deleting when the indexed
    /// entry is not actually due yet (capped timer, or re-stored meanwhile).
    async fn expire(&self, key: &str) {
        let remaining = self
            .index
            .read()
            .await
            .record(key)
            .map(IndexRecord::ttl_remaining_ms);

        if let Some(remaining) = remaining.filter(|ms| *ms > 0) {
            debug!(cache = self.id, key, remaining, "Expiry: not due yet, re-arming");
            self.scheduler.arm(key, remaining).await;
            return;
        }

        self.trace(format_args!("clearing expired entry for \"{key}\""));
        self.backend.delete(key).await;
        self.index.write().await.forget(key);
        self.stats.write().await.record_expiration();
    }
}

#[async_trait]
impl ExpiryHandler for Inner {
    async fn on_expire(&self, key: String) {
        self.expire(&key).await;
    }
}
