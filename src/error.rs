//! Error types for the offline caching layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache, storage and diagnostics operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Requested item is not cached
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Durable storage rejected a read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem failure underneath durable storage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Upstream fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Fetch Error Enum ==
/// Failure of a single network fetch.
///
/// Non-2xx responses are not errors; they come back as responses and the
/// strategies decide what to do with them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the allotted time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Response arrived but the body could not be read or parsed
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(Duration::ZERO)
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Fetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Storage(_)
            | CacheError::Io(_)
            | CacheError::Serialization(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
