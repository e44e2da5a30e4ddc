//! Cache Entry Module
//!
//! Defines the stored entry, the receipt a backend hands back on store, and the
//! index record the facade keeps per live key.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A stored artifact as returned by a backend.
///
/// `content` is `None` when the backend holds the key but its payload is
/// empty or unreadable, which is distinct from a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored content
    pub content: Option<Bytes>,
    /// Expiration timestamp (Unix milliseconds)
    pub expire_at: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl_ms` from now.
    pub fn new(content: Bytes, ttl_ms: i64) -> Self {
        Self {
            content: Some(content),
            expire_at: current_timestamp_ms().saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expire_at`.
    pub fn is_expired(&self) -> bool {
        is_past(self.expire_at)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> i64 {
        remaining_ms(self.expire_at)
    }
}

// == Store Receipt ==
/// Acknowledgement returned by a backend after a successful store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    /// Backend-assigned id of the stored content
    pub locator: String,
    /// Expiration timestamp the backend recorded (Unix milliseconds)
    pub expire_at: i64,
}

// == Index Record ==
/// Bookkeeping for one live key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub key: String,
    pub locator: String,
    pub expire_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl IndexRecord {
    /// Builds the record for `key` from a backend receipt.
    pub fn from_receipt(key: &str, receipt: StoreReceipt, group: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            locator: receipt.locator,
            expire_at: receipt.expire_at,
            group: group.map(str::to_string),
        }
    }

    pub fn ttl_remaining_ms(&self) -> i64 {
        remaining_ms(self.expire_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Milliseconds left until `expire_at`, never negative.
pub fn remaining_ms(expire_at: i64) -> i64 {
    expire_at.saturating_sub(current_timestamp_ms()).max(0)
}

/// Whether `expire_at` has been reached.
pub fn is_past(expire_at: i64) -> bool {
    current_timestamp_ms() >= expire_at
}
