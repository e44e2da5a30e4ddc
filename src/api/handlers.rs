//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::cache::{Cache, DurationSpec, IndexListing};
use crate::error::{CacheError, Result};
use crate::models::{
    HealthResponse, InvalidateResponse, PutEntryRequest, StatsResponse, StoreResponse,
};

/// Names the backend that served an entry.
pub const BACKEND_HEADER: &str = "x-cache-backend";

/// Application state shared across all handlers.
///
/// `Cache` is already a shared handle, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /entry/:key
///
/// Stores content under a key, with an optional duration and group.
pub async fn put_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<PutEntryRequest>,
) -> Result<Json<StoreResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let duration = req
        .duration
        .unwrap_or(DurationSpec::Millis(state.cache.options().default_duration_ms));
    let duration_ms = state.cache.duration(duration);

    state
        .cache
        .store(&key, req.content, duration_ms, req.group.as_deref())
        .await?;

    Ok(Json(StoreResponse::new(key, duration_ms, req.group)))
}

/// Handler for GET /entry/:key
///
/// Returns the raw cached content. An entry present without content answers
/// 204 so it stays distinguishable from a miss.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let entry = state
        .cache
        .fetch(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    let backend = [(BACKEND_HEADER, state.cache.backend_type().as_str())];
    let response = match entry.content {
        Some(content) => (backend, content).into_response(),
        None => (StatusCode::NO_CONTENT, backend).into_response(),
    };
    Ok(response)
}

/// Handler for GET /index
pub async fn index_handler(State(state): State<AppState>) -> Result<Response> {
    listing_response(state.cache.list(None).await, None)
}

/// Handler for GET /index/:group
pub async fn group_handler(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Response> {
    listing_response(state.cache.list(Some(group.as_str())).await, Some(group.as_str()))
}

fn listing_response(listing: IndexListing, group: Option<&str>) -> Result<Response> {
    match listing {
        IndexListing::All(snapshot) => Ok(Json(snapshot).into_response()),
        IndexListing::Group(keys) => Ok(Json(json!({ "group": group, "keys": keys })).into_response()),
        IndexListing::NotFound => Err(CacheError::NotFound(format!(
            "group '{}'",
            group.unwrap_or_default()
        ))),
    }
}

/// Handler for DELETE /clear
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate(None).await;
    Json(InvalidateResponse::new(None, removed))
}

/// Handler for DELETE /clear/:target
///
/// `target` is a group name or a key; groups take precedence.
pub async fn clear_target_handler(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Json<InvalidateResponse> {
    let removed = state.cache.invalidate(Some(target.as_str())).await;
    Json(InvalidateResponse::new(Some(target.as_str()), removed))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(
        state.cache.id(),
        state.cache.backend_type(),
        &stats,
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
