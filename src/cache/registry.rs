//! Cache Registry
//!
//! Owns every cache instance created through it and hands out sequential ids.

use std::sync::Arc;

use tracing::info;

use crate::backend::StorageBackend;
use crate::cache::{Cache, CacheOptions};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct CacheRegistry {
    instances: Vec<Cache>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == New Instance ==
    /// Creates a cache with the next id. Ids start at 1.
    pub fn new_instance(
        &mut self,
        backend: Arc<dyn StorageBackend>,
        options: CacheOptions,
    ) -> Cache {
        let id = self.instances.len() + 1;
        let cache = Cache::with_id(id, backend, options);
        self.instances.push(cache.clone());
        info!(cache = id, "Registered cache instance");
        cache
    }

    /// Like [`new_instance`](Self::new_instance), then restores what the
    /// backend kept from a previous run.
    pub async fn open_instance(
        &mut self,
        backend: Arc<dyn StorageBackend>,
        options: CacheOptions,
    ) -> Result<Cache> {
        let cache = self.new_instance(backend, options);
        cache.restore().await?;
        Ok(cache)
    }

    /// New instance over the same backend and options, with an empty index.
    pub fn clone_instance(&mut self, cache: &Cache) -> Cache {
        self.new_instance(cache.backend(), cache.options().clone())
    }

    pub fn get(&self, id: usize) -> Option<&Cache> {
        id.checked_sub(1).and_then(|i| self.instances.get(i))
    }

    pub fn instances(&self) -> &[Cache] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
