//! Response DTOs for the dataset API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::store::{StatsSnapshot, StorageMode, StoreReceipt};

/// Response body for the STORE operation (PUT /datasets/:key)
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
    /// Storage layout used
    pub mode: StorageMode,
    /// Number of backend chunks written
    pub total_chunks: usize,
    /// Serialized size in bytes
    pub total_size: usize,
    /// TTL applied to every backend key
    pub ttl_seconds: u64,
    /// When the entry expires, in ISO 8601 format
    pub expires_at: String,
}

impl StoreResponse {
    /// Creates a new StoreResponse from a write receipt
    pub fn new(receipt: StoreReceipt, ttl_seconds: u64) -> Self {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds.min(i64::MAX as u64) as i64);
        Self {
            message: format!(
                "Key '{}' stored for {} seconds",
                receipt.key, ttl_seconds
            ),
            key: receipt.key,
            mode: receipt.mode,
            total_chunks: receipt.total_chunks,
            total_size: receipt.total_size,
            ttl_seconds,
            expires_at: expires_at.to_rfc3339(),
        }
    }
}

/// Response body for the RETRIEVE operation (GET /datasets/:key)
#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl RetrieveResponse {
    /// Creates a new RetrieveResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the DELETE operation (DELETE /datasets/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
    /// Backend keys that existed and were removed
    pub removed_keys: u64,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>, removed_keys: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
            removed_keys,
        }
    }
}

/// Response body for the EXISTS operation (GET /datasets/:key/exists)
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

impl ExistsResponse {
    pub fn new(key: impl Into<String>, exists: bool) -> Self {
        Self {
            key: key.into(),
            exists,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend in use (e.g., "memory", "upstash")
    pub backend: String,
    /// Configured chunk size in bytes
    pub max_chunk_size: usize,
    /// Store counters
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

impl StatsResponse {
    /// Creates a new StatsResponse from store statistics
    pub fn new(backend: impl Into<String>, max_chunk_size: usize, stats: StatsSnapshot) -> Self {
        Self {
            backend: backend.into(),
            max_chunk_size,
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "degraded")
    pub status: String,
    /// Backend in use
    pub backend: String,
    /// Backend failure, when degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a healthy HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Creates a degraded HealthResponse carrying the backend failure
    pub fn degraded(backend: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            backend: backend.into(),
            error: Some(error.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
