//! Cache Statistics Module
//!
//! Tracks facade-level counters: hits, misses, stores, invalidations, expirations.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Fetches that found an entry
    pub hits: u64,
    /// Fetches that found nothing
    pub misses: u64,
    /// Successful stores
    pub stores: u64,
    /// Explicit invalidation calls
    pub invalidations: u64,
    /// Entries removed by the expiry scheduler
    pub expirations: u64,
    /// Current number of indexed keys
    pub total_keys: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing has been fetched.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_store(&mut self) {
        self.stores += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn set_total_keys(&mut self, count: usize) {
        self.total_keys = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.stores, 0);
        assert_eq!(stats.total_keys, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_counters() {
        let mut stats = CacheStats::new();
        stats.record_store();
        stats.record_invalidation();
        stats.record_expiration();
        stats.record_expiration();
        stats.set_total_keys(7);

        assert_eq!(stats.stores, 1);
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.total_keys, 7);
    }
}
