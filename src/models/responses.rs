//! Response DTOs for the admin HTTP API
//!
//! Errors are rendered by `CacheError`'s `IntoResponse` impl as
//! `{"error": "..."}`.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::tasks::WarmingJobStatus;

/// Response body for `GET /get/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for `PUT /set`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
    /// Effective TTL in seconds, 0 = no expiry
    pub ttl: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            ttl,
        }
    }
}

/// Response body for `DELETE /del/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for `GET /stats` and `GET /stats/:namespace`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// None for the aggregate across all namespaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
    /// Namespaces seen so far; only on the aggregate
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
}

impl StatsResponse {
    pub fn total(stats: CacheStats, namespaces: Vec<String>) -> Self {
        Self {
            namespace: None,
            hit_rate: stats.hit_rate(),
            stats,
            namespaces,
        }
    }

    pub fn namespace(namespace: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            namespace: Some(namespace.into()),
            hit_rate: stats.hit_rate(),
            stats,
            namespaces: Vec::new(),
        }
    }
}

/// Response body for `GET /warming`
#[derive(Debug, Clone, Serialize)]
pub struct WarmingResponse {
    pub running: bool,
    pub jobs: Vec<WarmingJobStatus>,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
