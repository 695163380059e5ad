//! Chunk Store Module
//!
//! Write, read, delete and presence operations over a `Backend`, keeping the
//! simple and chunked layouts consistent with each other.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    chunk_key, decode_canonical, deserialize, meta_key, serialize, validate_key, CacheValue,
    ChunkMetadata, ChunkPlan, Payload, StatsSnapshot, StoreStats,
};
use crate::backend::{Backend, Command};
use crate::error::{CacheError, Result};

// == Storage Mode ==
/// How an entry was laid out in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Whole payload at `{key}`
    Simple,
    /// Metadata at `{key}:meta` plus `{key}:chunk:{i}` slices
    Chunked,
}

// == Store Receipt ==
/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReceipt {
    pub key: String,
    pub mode: StorageMode,
    pub total_chunks: usize,
    pub total_size: usize,
}

// == Read Paths ==
/// Read strategies, tried in order until one applies.
#[derive(Debug, Clone, Copy)]
enum ReadPath {
    /// Applies when `{key}:meta` exists
    Chunked,
    /// Applies otherwise
    Simple,
}

const READ_PATHS: [ReadPath; 2] = [ReadPath::Chunked, ReadPath::Simple];

enum Lookup {
    Found(CacheValue),
    Absent,
    /// The path's precondition does not hold; try the next one
    Skip,
}

// == Chunk Store ==
/// Stores values of any size on a backend with a per-value ceiling.
///
/// Cloning is cheap; clones share the backend handle and statistics.
#[derive(Clone)]
pub struct ChunkStore {
    backend: Arc<dyn Backend>,
    max_chunk_size: usize,
    stats: Arc<StoreStats>,
}

impl ChunkStore {
    // == Constructor ==
    /// Creates a store writing chunks of at most `max_chunk_size` bytes.
    ///
    /// A zero chunk size is raised to 1.
    pub fn new(backend: Arc<dyn Backend>, max_chunk_size: usize) -> Self {
        Self {
            backend,
            max_chunk_size: max_chunk_size.max(1),
            stats: Arc::new(StoreStats::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // == Store ==
    /// Stores `value` under `key` for `ttl_seconds`, replacing any prior entry.
    ///
    /// Returns false when the write failed; the cause is logged.
    pub async fn store(&self, key: &str, value: &CacheValue, ttl_seconds: u64) -> bool {
        match self.try_store(key, value, ttl_seconds).await {
            Ok(_) => true,
            Err(e) => {
                warn!("store failed for key {}: {}", key, e);
                false
            }
        }
    }

    /// Stores any serializable value. Values without a JSON form are not stored.
    pub async fn store_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> bool {
        match CacheValue::from_serialize(value) {
            Ok(value) => self.store(key, &value, ttl_seconds).await,
            Err(e) => {
                self.stats.record_failure();
                warn!("store failed for key {}: {}", key, e);
                false
            }
        }
    }

    /// Stores `value` and reports how it was laid out.
    ///
    /// Payloads up to the chunk size go to `{key}` and any stale metadata is
    /// removed. Larger canonical payloads are split; chunks are written
    /// before the metadata, and a stale simple value is removed. Everything
    /// goes out as one pipeline with the same TTL. A partially failed
    /// pipeline is not repaired; readers treat the entry as a miss.
    pub async fn try_store(
        &self,
        key: &str,
        value: &CacheValue,
        ttl_seconds: u64,
    ) -> Result<StoreReceipt> {
        validate_key(key)?;
        if ttl_seconds == 0 {
            return Err(CacheError::InvalidRequest(
                "TTL must be at least 1 second".to_string(),
            ));
        }

        let payload = serialize(value)?;
        let result = self.write_payload(key, &payload, ttl_seconds).await;

        match &result {
            Ok(receipt) if receipt.mode == StorageMode::Chunked => {
                self.stats.record_chunked_write(receipt.total_chunks);
                info!(
                    "stored key {} in {} chunks ({} bytes, ttl {}s)",
                    key, receipt.total_chunks, receipt.total_size, ttl_seconds
                );
            }
            Ok(receipt) => {
                self.stats.record_simple_write();
                debug!(
                    "stored key {} directly ({} bytes, ttl {}s)",
                    key, receipt.total_size, ttl_seconds
                );
            }
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    async fn write_payload(
        &self,
        key: &str,
        payload: &Payload,
        ttl_seconds: u64,
    ) -> Result<StoreReceipt> {
        if let Payload::Canonical(encoded) = payload {
            let plan = ChunkPlan::new(encoded, self.max_chunk_size)?;
            if !plan.is_single() {
                return self.write_chunked(key, plan, ttl_seconds).await;
            }
        }

        self.backend
            .pipeline(vec![
                Command::del(meta_key(key)),
                Command::set(key, payload.as_str(), ttl_seconds),
            ])
            .await?;

        Ok(StoreReceipt {
            key: key.to_string(),
            mode: StorageMode::Simple,
            total_chunks: 1,
            total_size: payload.len(),
        })
    }

    async fn write_chunked(
        &self,
        key: &str,
        plan: ChunkPlan<'_>,
        ttl_seconds: u64,
    ) -> Result<StoreReceipt> {
        let meta = ChunkMetadata::new(plan.total_chunks(), plan.total_size());

        let mut commands = Vec::with_capacity(meta.total_chunks + 2);
        commands.push(Command::del(key));
        commands.extend(
            plan.chunks()
                .enumerate()
                .map(|(i, chunk)| Command::set(chunk_key(key, i), chunk, ttl_seconds)),
        );
        commands.push(Command::set(meta_key(key), meta.to_wire()?, ttl_seconds));

        self.backend.pipeline(commands).await?;

        Ok(StoreReceipt {
            key: key.to_string(),
            mode: StorageMode::Chunked,
            total_chunks: meta.total_chunks,
            total_size: meta.total_size,
        })
    }

    // == Retrieve ==
    /// Returns the value under `key`, or `None` on a miss or any failure.
    pub async fn retrieve(&self, key: &str) -> Option<CacheValue> {
        match self.try_retrieve(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("retrieve failed for key {}: {}", key, e);
                None
            }
        }
    }

    /// Retrieves and converts to a typed value; conversion failures are misses.
    pub async fn retrieve_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.retrieve(key).await?;
        match value.into_typed() {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("retrieve failed for key {}: {}", key, e);
                None
            }
        }
    }

    /// Returns the value under `key`.
    ///
    /// `Ok(None)` covers ordinary misses and incomplete chunked entries
    /// (missing chunk, bad metadata). Backend failures and payloads that do
    /// not decode after reconstruction are errors.
    pub async fn try_retrieve(&self, key: &str) -> Result<Option<CacheValue>> {
        validate_key(key)?;

        for path in READ_PATHS {
            let lookup = match path {
                ReadPath::Chunked => self.read_chunked(key).await,
                ReadPath::Simple => self.read_simple(key).await,
            };

            match lookup {
                Ok(Lookup::Skip) => continue,
                Ok(Lookup::Found(value)) => {
                    self.stats.record_hit();
                    debug!("retrieved key {} via {:?} path", key, path);
                    return Ok(Some(value));
                }
                Ok(Lookup::Absent) => break,
                Err(e) if e.is_partial_entry() => {
                    self.stats.record_corrupt_read();
                    warn!("treating key {} as a miss: {}", key, e);
                    break;
                }
                Err(e) => {
                    self.stats.record_failure();
                    return Err(e);
                }
            }
        }

        self.stats.record_miss();
        debug!("cache miss for key {}", key);
        Ok(None)
    }

    async fn read_chunked(&self, key: &str) -> Result<Lookup> {
        let raw = match self.backend.get(&meta_key(key)).await? {
            Some(raw) => raw,
            None => return Ok(Lookup::Skip),
        };
        let meta = ChunkMetadata::from_wire(key, &raw)?;

        // Capacity grows with the chunks actually read, never from the record
        let mut payload = String::new();
        for index in 0..meta.total_chunks {
            match self.backend.get(&chunk_key(key, index)).await? {
                Some(chunk) if payload.len() + chunk.len() > meta.total_size => {
                    return Err(CacheError::MalformedMetadata {
                        key: key.to_string(),
                        reason: format!(
                            "chunk {} runs past the recorded {} bytes",
                            index, meta.total_size
                        ),
                    })
                }
                Some(chunk) => payload.push_str(&chunk),
                None => {
                    return Err(CacheError::MissingChunk {
                        key: key.to_string(),
                        index,
                        total: meta.total_chunks,
                    })
                }
            }
        }

        // Chunks from two different writes can line up without any gap
        if payload.len() != meta.total_size {
            return Err(CacheError::MalformedMetadata {
                key: key.to_string(),
                reason: format!(
                    "reassembled {} bytes, metadata records {}",
                    payload.len(),
                    meta.total_size
                ),
            });
        }

        decode_canonical(key, &payload).map(Lookup::Found)
    }

    async fn read_simple(&self, key: &str) -> Result<Lookup> {
        Ok(match self.backend.get(key).await? {
            Some(raw) => Lookup::Found(deserialize(raw)),
            None => Lookup::Absent,
        })
    }

    // == Delete ==
    /// Removes every key belonging to `key`. Absent keys succeed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.try_delete(key).await {
            Ok(_) => true,
            Err(e) => {
                warn!("delete failed for key {}: {}", key, e);
                false
            }
        }
    }

    /// Removes every key belonging to `key`, returning how many existed.
    pub async fn try_delete(&self, key: &str) -> Result<u64> {
        validate_key(key)?;

        let result = self.delete_keys(key).await;
        match &result {
            Ok(removed) => {
                self.stats.record_delete();
                debug!("deleted key {} ({} backend keys)", key, removed);
            }
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    async fn delete_keys(&self, key: &str) -> Result<u64> {
        let meta_slot = meta_key(key);
        let keys = match self.backend.get(&meta_slot).await? {
            Some(raw) => match ChunkMetadata::from_wire(key, &raw) {
                Ok(meta) => {
                    let mut keys = meta.chunk_keys(key);
                    keys.push(meta_slot);
                    keys.push(key.to_string());
                    keys
                }
                Err(e) => {
                    // Chunk count unknown; orphaned chunks expire with their TTL
                    warn!("deleting key {} without its chunks: {}", key, e);
                    vec![meta_slot, key.to_string()]
                }
            },
            None => vec![key.to_string()],
        };

        self.backend.del(&keys).await
    }

    // == Exists ==
    /// True if `key` is stored in either layout. Backend failures count as absent.
    pub async fn exists(&self, key: &str) -> bool {
        match self.try_exists(key).await {
            Ok(present) => present,
            Err(e) => {
                warn!("exists failed for key {}: {}", key, e);
                false
            }
        }
    }

    /// Presence probe that never fetches the payload.
    pub async fn try_exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        if self.backend.exists(key).await? {
            return Ok(true);
        }
        self.backend.exists(&meta_key(key)).await
    }
}
