//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /entry/:key` - Raw cached content
//! - `PUT /entry/:key` - Store content with optional duration and group
//! - `GET /index` - All keys and groups
//! - `GET /index/:group` - Keys of one group
//! - `DELETE /clear` - Invalidate everything
//! - `DELETE /clear/:target` - Invalidate a group or a key
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
