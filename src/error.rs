//! Error types for the chunked store
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the chunked store and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Network, auth or rate-limit failure reported by the backend
    #[error("Backend error during {command}: {message}")]
    Backend { command: String, message: String },

    /// Some commands of a batched write failed
    #[error("Pipeline failed for {failed} of {total} commands: {first_error}")]
    Pipeline {
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// A typed value could not be canonically encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A chunk listed in the metadata record is absent
    #[error("Missing chunk {index} of {total} for key: {key}")]
    MissingChunk {
        key: String,
        index: usize,
        total: usize,
    },

    /// The metadata record exists but cannot be decoded
    #[error("Malformed metadata for key {key}: {reason}")]
    MalformedMetadata { key: String, reason: String },

    /// Reconstructed payload is not valid encoded data
    #[error("Failed to parse payload for key {key}: {reason}")]
    Parse { key: String, reason: String },

    /// Invalid key, TTL or request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Create a new backend error for the given command.
    pub fn backend(command: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::Backend {
            command: command.into(),
            message: message.into(),
        }
    }

    /// True for failures worth retrying later (backend unavailable).
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Backend { .. } | CacheError::Pipeline { .. })
    }

    /// True for read-time corruption that resolves to a cache miss.
    pub fn is_partial_entry(&self) -> bool {
        matches!(
            self,
            CacheError::MissingChunk { .. } | CacheError::MalformedMetadata { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            err if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the chunked store.
pub type Result<T> = std::result::Result<T, CacheError>;
