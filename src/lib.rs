//! Response Cache - a time-bounded cache for computed responses
//!
//! Stores content under string keys for a bounded duration on a pluggable
//! backend (memory, filesystem, remote key-value store), with named groups for
//! bulk invalidation and an optional admin HTTP surface.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use backend::{BackendKind, CacheEvent, StorageBackend};
pub use cache::{Cache, CacheOptions, CacheRegistry, DurationSpec, IndexListing};
pub use config::Config;
pub use error::{CacheError, Result};
