//! Integration Tests for the Chunked Store
//!
//! Exercises store/retrieve/delete/exists against the in-memory backend,
//! including realistic sizes and partially failed writes.

use std::sync::Arc;

use async_trait::async_trait;
use chunk_cache::backend::Command;
use chunk_cache::error::{CacheError, Result};
use chunk_cache::store::{
    chunk_key, encode_canonical, meta_key, StorageMode, DEFAULT_MAX_CHUNK_SIZE,
};
use chunk_cache::{Backend, CacheValue, ChunkStore, MemoryBackend};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TTL: u64 = 900;

fn store_with(chunk_size: usize) -> (ChunkStore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    (ChunkStore::new(backend.clone(), chunk_size), backend)
}

/// A JSON string that serializes to exactly `len` bytes.
fn string_of_len(len: usize) -> Value {
    Value::String("x".repeat(len - 2))
}

// == Flaky Backend ==
/// Memory backend that fails SETs (in pipelines) or GETs to one key.
struct FlakyBackend {
    inner: MemoryBackend,
    failing_key: String,
    fail_reads: bool,
}

#[async_trait]
impl Backend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads && key == self.failing_key {
            return Err(CacheError::backend("GET", "request timed out"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.inner.set(key, value, ttl_seconds).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        self.inner.del(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn pipeline(&self, commands: Vec<Command>) -> Result<()> {
        let total = commands.len();
        let (dropped, kept): (Vec<_>, Vec<_>) = commands.into_iter().partition(|command| {
            !self.fail_reads
                && matches!(command, Command::Set { .. })
                && command.key() == self.failing_key
        });

        self.inner.pipeline(kept).await?;
        if dropped.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Pipeline {
                failed: dropped.len(),
                total,
                first_error: "rate limit exceeded".to_string(),
            })
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn flaky_store(chunk_size: usize, failing_key: &str) -> (ChunkStore, Arc<FlakyBackend>) {
    flaky_backend_store(chunk_size, failing_key, false)
}

fn unreadable_store(chunk_size: usize, failing_key: &str) -> (ChunkStore, Arc<FlakyBackend>) {
    flaky_backend_store(chunk_size, failing_key, true)
}

fn flaky_backend_store(
    chunk_size: usize,
    failing_key: &str,
    fail_reads: bool,
) -> (ChunkStore, Arc<FlakyBackend>) {
    let backend = Arc::new(FlakyBackend {
        inner: MemoryBackend::new(),
        failing_key: failing_key.to_string(),
        fail_reads,
    });
    (ChunkStore::new(backend.clone(), chunk_size), backend)
}

// == Realistic Sizes ==

#[tokio::test]
async fn test_five_megabyte_array_uses_six_chunks() {
    let (store, backend) = store_with(DEFAULT_MAX_CHUNK_SIZE);

    // 50,000 quoted 98-char strings: about 5 MB once serialized
    let rows: Vec<String> = (0..50_000).map(|i| format!("{:098}", i)).collect();
    let value = CacheValue::Json(json!(rows));
    let encoded_len = encode_canonical(&rows).unwrap().len();
    assert!(encoded_len > 5_000_000);

    let receipt = store.try_store("ds-1", &value, TTL).await.unwrap();
    assert_eq!(receipt.mode, StorageMode::Chunked);
    assert_eq!(receipt.total_chunks, 6);
    assert_eq!(receipt.total_size, encoded_len);

    for index in 0..5 {
        let chunk = backend.get(&chunk_key("ds-1", index)).await.unwrap().unwrap();
        assert_eq!(chunk.len(), DEFAULT_MAX_CHUNK_SIZE);
    }
    let last = backend.get(&chunk_key("ds-1", 5)).await.unwrap().unwrap();
    assert_eq!(last.len(), encoded_len - 5 * DEFAULT_MAX_CHUNK_SIZE);

    assert_eq!(store.retrieve("ds-1").await, Some(value));

    assert!(store.delete("ds-1").await);
    assert!(!store.exists("ds-1").await);
    assert!(backend.is_empty().await);
}

#[tokio::test]
async fn test_sizes_from_tiny_to_ten_chunks() {
    const CHUNK: usize = 100;
    let (store, backend) = store_with(CHUNK);

    for len in [10, 99, 100, 101, 250, 999, 1000] {
        let key = format!("size-{}", len);
        let value = CacheValue::Json(string_of_len(len));

        let receipt = store.try_store(&key, &value, TTL).await.unwrap();
        assert_eq!(receipt.total_size, len);
        assert_eq!(receipt.total_chunks, len.div_ceil(CHUNK));
        assert_eq!(
            receipt.mode == StorageMode::Chunked,
            len > CHUNK,
            "layout for {} bytes",
            len
        );
        assert_eq!(backend.exists(&meta_key(&key)).await.unwrap(), len > CHUNK);
        assert_eq!(store.retrieve(&key).await, Some(value));
    }
}

#[tokio::test]
async fn test_exact_chunk_size_boundary() {
    const CHUNK: usize = 50;
    let (store, backend) = store_with(CHUNK);

    let exact = store
        .try_store("exact", &CacheValue::Json(string_of_len(CHUNK)), TTL)
        .await
        .unwrap();
    assert_eq!(exact.mode, StorageMode::Simple);
    assert!(!backend.exists("exact:meta").await.unwrap());

    let over = store
        .try_store("over", &CacheValue::Json(string_of_len(CHUNK + 1)), TTL)
        .await
        .unwrap();
    assert_eq!(over.mode, StorageMode::Chunked);
    assert_eq!(over.total_chunks, 2);
    assert_eq!(backend.get("over:chunk:0").await.unwrap().unwrap().len(), CHUNK);
    assert_eq!(backend.get("over:chunk:1").await.unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_containers_roundtrip() {
    let (store, backend) = store_with(16);

    for (key, value) in [("obj", json!({})), ("arr", json!([])), ("str", json!(""))] {
        let value = CacheValue::Json(value);
        assert!(store.store(key, &value, TTL).await);
        assert_eq!(store.retrieve(key).await, Some(value));
    }
    assert_eq!(backend.len().await, 3);
}

// == Encoding ==

#[tokio::test]
async fn test_non_ascii_across_chunk_boundaries() {
    let (store, backend) = store_with(7);
    let value = CacheValue::Json(json!({"名前": "漢字とかな 😀 café", "emoji": ["🚀", "✓"]}));

    let receipt = store.try_store("unicode", &value, TTL).await.unwrap();
    assert_eq!(receipt.mode, StorageMode::Chunked);

    for index in 0..receipt.total_chunks {
        let chunk = backend.get(&chunk_key("unicode", index)).await.unwrap().unwrap();
        assert!(chunk.is_ascii());
    }
    assert_eq!(store.retrieve("unicode").await, Some(value));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Measurement {
    sensor: String,
    readings: Vec<i64>,
}

#[tokio::test]
async fn test_typed_values_roundtrip() {
    let (store, _) = store_with(32);
    let measurement = Measurement {
        sensor: "north-gate".to_string(),
        readings: (0..40).collect(),
    };

    assert!(store.store_json("m1", &measurement, TTL).await);
    let back: Option<Measurement> = store.retrieve_json("m1").await;
    assert_eq!(back, Some(measurement));

    // Wrong target type is a miss, not a panic
    let wrong: Option<u64> = store.retrieve_json("m1").await;
    assert_eq!(wrong, None);
}

#[tokio::test]
async fn test_opaque_text_passthrough() {
    let (store, backend) = store_with(16);
    let value = CacheValue::Opaque("plain text, not json".to_string());

    let receipt = store.try_store("raw", &value, TTL).await.unwrap();
    assert_eq!(receipt.mode, StorageMode::Simple);
    assert_eq!(
        backend.get("raw").await.unwrap().as_deref(),
        Some("plain text, not json")
    );
    assert_eq!(store.retrieve("raw").await, Some(value));
}

// == TTL ==

#[tokio::test]
async fn test_every_key_shares_the_ttl() {
    let (store, backend) = store_with(16);
    let value = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));

    assert!(store.store("ttl", &value, 120).await);

    let keys = backend.keys().await;
    assert!(keys.len() > 2);
    for key in keys {
        let remaining = backend.ttl(&key).await.unwrap();
        assert!(remaining > 0 && remaining <= 120, "{} has ttl {}", key, remaining);
    }
}

// == Overwrite ==

#[tokio::test]
async fn test_overwrite_across_layouts() {
    let (store, backend) = store_with(16);
    let small = CacheValue::Json(json!({"v": 1}));
    let large = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));
    let medium = CacheValue::Json(json!([1, 2, 3, 4, 5, 6, 7, 8, 9]));

    assert!(store.store("ds", &small, TTL).await);
    assert!(store.store("ds", &large, TTL).await);
    assert!(!backend.exists("ds").await.unwrap());
    assert_eq!(store.retrieve("ds").await, Some(large));

    assert!(store.store("ds", &medium, TTL).await);
    assert_eq!(store.retrieve("ds").await, Some(medium));

    assert!(store.store("ds", &small, TTL).await);
    assert!(!backend.exists("ds:meta").await.unwrap());
    assert_eq!(store.retrieve("ds").await, Some(small));
}

// == Partial Failures ==

#[tokio::test]
async fn test_failed_chunk_write_reads_as_miss() {
    let (store, backend) = flaky_store(16, "ds:chunk:1");
    let value = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));

    let result = store.try_store("ds", &value, TTL).await;
    assert!(matches!(result, Err(CacheError::Pipeline { failed: 1, .. })));

    // The rest of the pipeline landed, including the metadata
    assert!(backend.exists("ds:meta").await.unwrap());
    assert!(backend.exists("ds:chunk:0").await.unwrap());

    assert!(matches!(store.try_retrieve("ds").await, Ok(None)));
    assert_eq!(store.stats().corrupt_reads, 1);
    assert_eq!(store.stats().failures, 1);
}

#[tokio::test]
async fn test_failed_chunk_read_fails_whole_reconstruction() {
    let (store, _) = unreadable_store(16, "ds:chunk:1");
    let value = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));

    assert!(store.store("ds", &value, TTL).await);

    assert!(matches!(
        store.try_retrieve("ds").await,
        Err(CacheError::Backend { .. })
    ));
    assert_eq!(store.retrieve("ds").await, None);
    assert!(store.exists("ds").await);

    let stats = store.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.corrupt_reads, 0);
    assert_eq!(stats.failures, 2);
}

#[tokio::test]
async fn test_failed_metadata_write_reads_as_miss() {
    let (store, backend) = flaky_store(16, "ds:meta");
    let value = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));

    assert!(!store.store("ds", &value, TTL).await);
    assert!(backend.exists("ds:chunk:0").await.unwrap());
    assert_eq!(store.retrieve("ds").await, None);
    assert!(!store.exists("ds").await);
}

#[tokio::test]
async fn test_chunk_over_backend_ceiling_fails() {
    let backend = Arc::new(MemoryBackend::with_max_value_size(64));
    let store = ChunkStore::new(backend.clone(), 128);
    let value = CacheValue::Json(string_of_len(500));

    let result = store.try_store("too-big", &value, TTL).await;
    assert!(matches!(result, Err(CacheError::Pipeline { .. })));
    assert_eq!(store.retrieve("too-big").await, None);
}

#[tokio::test]
async fn test_malformed_metadata_reads_as_miss() {
    let (store, backend) = store_with(16);
    backend.set("ds:meta", "{not metadata", TTL).await.unwrap();

    assert!(matches!(store.try_retrieve("ds").await, Ok(None)));
    // Delete still clears what it can find
    assert!(store.delete("ds").await);
    assert!(backend.is_empty().await);
}

// == Delete / Exists ==

#[tokio::test]
async fn test_delete_is_complete_and_idempotent() {
    let (store, backend) = store_with(16);
    let value = CacheValue::Json(json!((0..30).collect::<Vec<u32>>()));

    assert!(store.store("ds", &value, TTL).await);
    let stored_keys = backend.len().await;

    assert_eq!(store.try_delete("ds").await.unwrap(), stored_keys as u64);
    assert!(backend.is_empty().await);
    assert!(!store.exists("ds").await);

    assert_eq!(store.try_delete("ds").await.unwrap(), 0);
    assert!(store.delete("ds").await);
}

#[tokio::test]
async fn test_exists_both_layouts() {
    let (store, _) = store_with(16);

    assert!(!store.exists("small").await);
    assert!(store.store("small", &CacheValue::Json(json!(1)), TTL).await);
    assert!(store
        .store("large", &CacheValue::Json(json!((0..30).collect::<Vec<u32>>())), TTL)
        .await);

    assert!(store.exists("small").await);
    assert!(store.exists("large").await);
}

#[tokio::test]
async fn test_invalid_keys_rejected_everywhere() {
    let (store, backend) = store_with(16);
    let value = CacheValue::Json(json!(1));

    for key in ["", "x:meta", "x:chunk:0"] {
        assert!(matches!(
            store.try_store(key, &value, TTL).await,
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(store.try_retrieve(key).await.is_err());
        assert!(!store.delete(key).await);
        assert!(!store.exists(key).await);
    }
    assert!(backend.is_empty().await);
}
