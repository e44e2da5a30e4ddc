//! Cache Module
//!
//! The cache facade and the pieces it is built from: entries, duration
//! parsing, the key/group index, statistics and the status-code policy.

mod duration;
mod entry;
mod facade;
mod index;
mod policy;
mod registry;
mod stats;


// Re-export public types
pub use duration::{parse_duration, DurationSpec};
pub use entry::{current_timestamp_ms, is_past, remaining_ms, CacheEntry, IndexRecord, StoreReceipt};
pub use facade::{Cache, CacheOptions, IndexListing, DEFAULT_DURATION_MS};
pub use index::{GlobalIndex, IndexSnapshot};
pub use policy::{ResponseDescriptor, StatusCodes};
pub use registry::CacheRegistry;
pub use stats::CacheStats;
