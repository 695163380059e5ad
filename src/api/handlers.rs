//! API Handlers
//!
//! HTTP request handlers for the dataset endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::backend;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, ExistsResponse, HealthResponse, RetrieveResponse, StatsResponse,
    StoreParams, StoreResponse,
};
use crate::store::{CacheValue, ChunkStore};

/// Application state shared across all handlers.
///
/// `ChunkStore` is cheap to clone and safe to share; no lock is needed.
#[derive(Clone)]
pub struct AppState {
    /// Chunked store over the selected backend
    pub store: ChunkStore,
    /// TTL applied when a request does not name one
    pub default_ttl: u64,
    /// Largest accepted request body in bytes
    pub max_upload_size: usize,
}

impl AppState {
    /// Creates a new AppState around the given store.
    pub fn new(store: ChunkStore, default_ttl: u64, max_upload_size: usize) -> Self {
        Self {
            store,
            default_ttl,
            max_upload_size,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Selects the backend (remote when reachable, in-memory otherwise) and
    /// wraps it in a store using the configured chunk size.
    pub async fn from_config(config: &Config) -> Self {
        let backend = backend::connect(config).await;
        let store = ChunkStore::new(backend, config.max_chunk_size);
        Self::new(store, config.default_ttl, config.max_upload_size)
    }
}

/// Handler for PUT /datasets/:key
///
/// Stores the JSON body under `key`, chunking it when it exceeds the chunk size.
pub async fn store_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<StoreParams>,
    Json(body): Json<Value>,
) -> Result<Json<StoreResponse>> {
    if let Some(error_msg) = params.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = params.effective_ttl(state.default_ttl);
    let receipt = state
        .store
        .try_store(&key, &CacheValue::Json(body), ttl)
        .await?;

    Ok(Json(StoreResponse::new(receipt, ttl)))
}

/// Handler for GET /datasets/:key
///
/// Returns the stored value; incomplete chunked entries are reported as not found.
pub async fn retrieve_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RetrieveResponse>> {
    match state.store.try_retrieve(&key).await? {
        Some(value) => Ok(Json(RetrieveResponse::new(key, value.into_json()))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /datasets/:key
///
/// Deleting an absent key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let removed = state.store.try_delete(&key).await?;
    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for GET /datasets/:key/exists
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let exists = state.store.try_exists(&key).await?;
    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for GET /stats
///
/// Returns store counters for this process.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.store.backend().name(),
        state.store.max_chunk_size(),
        state.store.stats(),
    ))
}

/// Handler for GET /health
///
/// Pings the backend. A failed ping reports "degraded" with 503.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.store.backend();
    match backend.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy(backend.name()))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::degraded(backend.name(), e.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::MemoryBackend;
    use crate::store::StorageMode;

    fn test_state(chunk_size: usize) -> AppState {
        let store = ChunkStore::new(Arc::new(MemoryBackend::new()), chunk_size);
        AppState::new(store, 300, 1024 * 1024)
    }

    #[tokio::test]
    async fn test_store_and_retrieve_handler() {
        let state = test_state(16);
        let body = json!({"rows": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]});

        let stored = store_handler(
            State(state.clone()),
            Path("report".to_string()),
            Query(StoreParams::default()),
            Json(body.clone()),
        )
        .await
        .unwrap();
        assert_eq!(stored.mode, StorageMode::Chunked);
        assert_eq!(stored.ttl_seconds, 300);

        let retrieved = retrieve_handler(State(state), Path("report".to_string()))
            .await
            .unwrap();
        assert_eq!(retrieved.value, body);
    }

    #[tokio::test]
    async fn test_retrieve_missing_key() {
        let state = test_state(16);

        let result = retrieve_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_rejects_zero_ttl() {
        let state = test_state(16);

        let result = store_handler(
            State(state),
            Path("k".to_string()),
            Query(StoreParams { ttl: Some(0) }),
            Json(json!(1)),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_delete_and_exists_handlers() {
        let state = test_state(16);
        store_handler(
            State(state.clone()),
            Path("to_delete".to_string()),
            Query(StoreParams { ttl: Some(60) }),
            Json(json!("value")),
        )
        .await
        .unwrap();

        let exists = exists_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(exists.exists);

        let deleted = delete_handler(State(state.clone()), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert_eq!(deleted.removed_keys, 1);

        let exists = exists_handler(State(state), Path("to_delete".to_string()))
            .await
            .unwrap();
        assert!(!exists.exists);
    }

    #[tokio::test]
    async fn test_stats_and_health_handlers() {
        let state = test_state(16);

        let stats = stats_handler(State(state.clone())).await;
        assert_eq!(stats.backend, "memory");
        assert_eq!(stats.max_chunk_size, 16);
        assert_eq!(stats.stats.hits, 0);

        let (status, health) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");
    }
}
