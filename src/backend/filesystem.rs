//! Filesystem backend.
//!
//! Layout under `cwd`:
//! - `<cwd>/<id>`: raw content bytes
//! - `<cwd>/index/<id>`: JSON record `{"id", "key", "expire"}`
//!
//! Ids are generated, so cache keys never have to be valid file names.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{BackendKind, EventBus, StorageBackend};
use crate::cache::{current_timestamp_ms, is_past, CacheEntry, IndexRecord, StoreReceipt};
use crate::error::{CacheError, Result};

const INDEX_DIR: &str = "index";

// == Options ==
#[derive(Debug, Clone, Default)]
pub struct FsOptions {
    /// Root directory, required
    pub cwd: PathBuf,
    /// Reload still-valid entries left by a previous run
    pub resume: bool,
}

impl FsOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            resume: false,
        }
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }
}

/// Persisted per-id metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FsRecord {
    id: String,
    key: String,
    expire: i64,
}

impl FsRecord {
    fn to_index_record(&self) -> IndexRecord {
        IndexRecord {
            key: self.key.clone(),
            locator: self.id.clone(),
            expire_at: self.expire,
            group: None,
        }
    }
}

#[derive(Debug, Default)]
struct FsState {
    /// Cache key to record
    records: HashMap<String, FsRecord>,
    /// Id to content already loaded in memory
    contents: HashMap<String, Bytes>,
}

// == Filesystem Backend ==
#[derive(Debug)]
pub struct FsBackend {
    cwd: PathBuf,
    resume: bool,
    state: RwLock<FsState>,
    /// Set once the directories exist and the resume scan is done
    ready: OnceCell<()>,
    events: EventBus,
}

impl FsBackend {
    // == Constructor ==
    /// Validates options. Directory setup and the resume scan run on the
    /// first operation; concurrent early callers all wait for it.
    pub fn new(options: FsOptions) -> Result<Self> {
        if options.cwd.as_os_str().is_empty() {
            return Err(CacheError::Config(
                "filesystem backend requires a cwd".to_string(),
            ));
        }

        Ok(Self {
            cwd: options.cwd,
            resume: options.resume,
            state: RwLock::new(FsState::default()),
            ready: OnceCell::new(),
            events: EventBus::new(),
        })
    }

    /// Creates the backend and waits for it to be ready.
    pub async fn open(options: FsOptions) -> Result<Self> {
        let backend = Self::new(options)?;
        backend.ready().await?;
        Ok(backend)
    }

    // == Ready Gate ==
    pub async fn ready(&self) -> Result<()> {
        if !self.ready.initialized() {
            debug!(cwd = %self.cwd.display(), "filesystem: waiting for startup");
        }
        self.ready.get_or_try_init(|| self.init()).await?;
        Ok(())
    }

    async fn init(&self) -> Result<()> {
        fs::create_dir_all(self.cwd.join(INDEX_DIR)).await?;
        if self.resume {
            self.scan().await?;
        }
        info!(cwd = %self.cwd.display(), resume = self.resume, "filesystem: ready");
        Ok(())
    }

    // == Resume Scan ==
    async fn scan(&self) -> Result<()> {
        let now = current_timestamp_ms();
        let mut restored: HashMap<String, FsRecord> = HashMap::new();
        let mut stale: Vec<String> = Vec::new();

        let mut dir = fs::read_dir(self.cwd.join(INDEX_DIR)).await?;
        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_file() {
                continue;
            }
            let path = item.path();
            let record: FsRecord = match fs::read(&path).await {
                Ok(raw) => match serde_json::from_slice(&raw) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "filesystem: unreadable index record");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "filesystem: cannot read index record");
                    continue;
                }
            };

            if record.expire <= now {
                stale.push(record.id);
                continue;
            }

            // Two ids for one key can survive a crash mid re-store; keep the later one.
            let keep_existing = restored
                .get(&record.key)
                .is_some_and(|existing| existing.expire >= record.expire);
            if keep_existing {
                stale.push(record.id);
            } else if let Some(replaced) = restored.insert(record.key.clone(), record) {
                stale.push(replaced.id);
            }
        }

        for id in &stale {
            self.remove_files(id).await;
        }

        info!(
            restored = restored.len(),
            discarded = stale.len(),
            "filesystem: resumed index"
        );
        self.state.write().await.records = restored;
        Ok(())
    }

    // == Paths ==
    fn content_path(&self, id: &str) -> PathBuf {
        self.cwd.join(id)
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.cwd.join(INDEX_DIR).join(id)
    }

    async fn remove_files(&self, id: &str) {
        for path in [self.content_path(id), self.record_path(id)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "filesystem: remove failed"),
            }
        }
    }

    /// Drops the key from memory and disk. Returns whether it was present.
    async fn remove_key(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            let record = state.records.remove(key);
            if let Some(record) = &record {
                state.contents.remove(&record.id);
            }
            record
        };

        match removed {
            Some(record) => {
                self.remove_files(&record.id).await;
                true
            }
            None => false,
        }
    }

    /// Removes `key` only if it still points at `id`, so a concurrent
    /// re-store is left alone.
    async fn drop_stale(&self, key: &str, id: &str) {
        let removed = {
            let mut state = self.state.write().await;
            let current = state.records.get(key).is_some_and(|r| r.id == id);
            if current {
                state.records.remove(key);
                state.contents.remove(id);
            }
            current
        };
        if removed {
            self.remove_files(id).await;
        }
    }

    async fn write_files(&self, record: &FsRecord, content: &[u8]) -> Result<()> {
        let meta = serde_json::to_vec(record)?;
        fs::write(self.content_path(&record.id), content).await?;
        fs::write(self.record_path(&record.id), meta).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FsBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.ready().await?;

        let found = {
            let state = self.state.read().await;
            state
                .records
                .get(key)
                .map(|record| (record.clone(), state.contents.get(&record.id).cloned()))
        };
        let Some((record, cached)) = found else {
            self.events.read(key);
            return Ok(None);
        };

        if is_past(record.expire) {
            self.events.read(key);
            return Ok(None);
        }

        let content = match cached {
            Some(content) => content,
            None => match fs::read(self.content_path(&record.id)).await {
                Ok(raw) => {
                    let content = Bytes::from(raw);
                    let mut state = self.state.write().await;
                    if state.records.get(key).map(|r| &r.id) == Some(&record.id) {
                        state.contents.insert(record.id.clone(), content.clone());
                    }
                    content
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(key, id = %record.id, "filesystem: content file missing, dropping entry");
                    self.drop_stale(key, &record.id).await;
                    self.events.read(key);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            },
        };

        self.events.read(key);
        Ok(Some(CacheEntry {
            content: Some(content),
            expire_at: record.expire,
        }))
    }

    async fn set(&self, key: &str, content: Bytes, ttl_ms: i64) -> Result<StoreReceipt> {
        self.ready().await?;

        if ttl_ms <= 0 {
            debug!(key, ttl_ms, "filesystem: non-positive ttl, not storing");
            self.remove_key(key).await;
            return Ok(StoreReceipt {
                locator: String::new(),
                expire_at: current_timestamp_ms(),
            });
        }

        let record = FsRecord {
            id: Uuid::new_v4().to_string(),
            key: key.to_string(),
            expire: current_timestamp_ms().saturating_add(ttl_ms),
        };

        if let Err(e) = self.write_files(&record, &content).await {
            self.remove_files(&record.id).await;
            return Err(CacheError::StorageIo(format!(
                "writing entry for {key}: {e}"
            )));
        }

        let receipt = StoreReceipt {
            locator: record.id.clone(),
            expire_at: record.expire,
        };

        let replaced = {
            let mut state = self.state.write().await;
            state.contents.insert(record.id.clone(), content);
            let replaced = state.records.insert(key.to_string(), record);
            if let Some(old) = &replaced {
                state.contents.remove(&old.id);
            }
            replaced
        };
        if let Some(old) = replaced {
            self.remove_files(&old.id).await;
        }

        debug!(key, id = %receipt.locator, "filesystem: saved");
        self.events.save(key);
        Ok(receipt)
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.ready().await {
            warn!(key, error = %e, "filesystem: delete before startup failed");
            return;
        }
        self.remove_key(key).await;
        self.events.expire(key);
    }

    async fn clear(&self, keys: &[String]) {
        if let Err(e) = self.ready().await {
            warn!(error = %e, "filesystem: clear before startup failed");
            return;
        }
        for key in keys {
            self.remove_key(key).await;
        }
        self.events.clear();
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn events(&self) -> &EventBus {
        &self.events
    }

    async fn resume(&self) -> Result<Vec<IndexRecord>> {
        self.ready().await?;
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|record| !is_past(record.expire))
            .map(FsRecord::to_index_record)
            .collect())
    }
}
