//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Every cache call goes
//! through the same decorated `Cache` the application uses.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{Cache, CacheMonitor};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
    WarmingResponse,
};
use crate::tasks::CacheWarmer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub monitor: Arc<CacheMonitor>,
    pub warmer: Arc<CacheWarmer>,
    /// TTL applied when a set request doesn't carry one
    pub default_ttl: Duration,
}

impl AppState {
    pub fn new(
        cache: Arc<dyn Cache>,
        monitor: Arc<CacheMonitor>,
        warmer: Arc<CacheWarmer>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            monitor,
            warmer,
            default_ttl,
        }
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl.map(Duration::from_secs).unwrap_or(state.default_ttl);
    state
        .cache
        .set(&req.key, req.value.into_bytes(), ttl)
        .await?;

    Ok(Json(SetResponse::new(req.key, ttl.as_secs())))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let bytes = state.cache.get(&key).await?;
    let value = String::from_utf8(bytes).map_err(|_| {
        CacheError::Serialization(format!("value for '{}' is not valid UTF-8", key))
    })?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::total(
        state.monitor.stats(),
        state.monitor.namespaces(),
    ))
}

/// Handler for GET /stats/:namespace
///
/// A namespace with no recorded operations reports zeroed counters.
pub async fn namespace_stats_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Json<StatsResponse> {
    let stats = state.monitor.namespace_stats(&namespace).unwrap_or_default();
    Json(StatsResponse::namespace(namespace, stats))
}

/// Handler for GET /warming
pub async fn warming_handler(State(state): State<AppState>) -> Json<WarmingResponse> {
    Json(WarmingResponse {
        running: state.warmer.is_running(),
        jobs: state.warmer.jobs(),
    })
}

/// Handler for POST /warming/:key/refresh
///
/// Runs the job's loader immediately and stores the result.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SetResponse>> {
    let ttl = state
        .warmer
        .jobs()
        .into_iter()
        .find(|job| job.key == key)
        .map(|job| job.ttl_secs.ceil() as u64)
        .ok_or_else(|| CacheError::KeyNotFound(format!("no warming job for '{}'", key)))?;

    state.warmer.refresh_now(&key).await?;
    Ok(Json(SetResponse::new(key, ttl)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
