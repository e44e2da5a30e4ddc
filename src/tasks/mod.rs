//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Expiry: fires per-key deadlines and drives the shared delete path

mod expiry;

pub use expiry::{spawn_expiry_task, ExpiryHandler, ExpiryScheduler, MAX_TIMER_DELAY};
