//! Error types for the caching engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache layer.
///
/// Variants fall into four groups: misses (`KeyNotFound`), backend faults
/// (`Backend`, `Redis`, `CacheFull`, `Closed`), security faults (`InvalidKey`,
/// `RateLimited`, `AccessDenied`) and corruption (`Decryption`).
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage failure in the underlying backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Failure reported by the redis cluster client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Cache is full and the policy found nothing to evict
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Operation attempted on a closed backend
    #[error("Cache is closed")]
    Closed,

    /// Missing or unusable encryption key
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Request rejected by the rate limiter
    #[error("Rate limit exceeded: at most {limit} requests per window")]
    RateLimited { limit: u32 },

    /// Request rejected by the access policy
    #[error("Access denied for key: {0}")]
    AccessDenied(String),

    /// Encryption failure
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Ciphertext failed integrity or format checks
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Warmer lifecycle misuse
    #[error("Warmer error: {0}")]
    Warmer(String),
}

impl CacheError {
    /// Returns true for cache-miss semantics, as opposed to a fault.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::KeyNotFound(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::KeyNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            CacheError::AccessDenied(_) => StatusCode::FORBIDDEN,
            CacheError::Backend(_)
            | CacheError::Redis(_)
            | CacheError::CacheFull(_)
            | CacheError::Closed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, CacheError>;
