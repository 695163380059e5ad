//! Metadata Record Module
//!
//! The companion record written at `{key}:meta` for chunked entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{chunk_key, encode_canonical, MAX_TOTAL_CHUNKS};
use crate::error::{CacheError, Result};

// == Chunk Metadata ==
/// Describes how a chunked entry was split.
///
/// Wire shape: `{"totalChunks": 6, "totalSize": 5242880, "timestamp": "2024-..Z"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Number of chunk keys, always at least 1
    pub total_chunks: usize,
    /// Length of the serialized payload in bytes
    pub total_size: usize,
    /// When the entry was written
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ChunkMetadata {
    /// Creates a record stamped with the current time.
    pub fn new(total_chunks: usize, total_size: usize) -> Self {
        Self {
            total_chunks,
            total_size,
            created_at: Utc::now(),
        }
    }

    /// Encodes the record for storage.
    pub fn to_wire(&self) -> Result<String> {
        encode_canonical(self)
    }

    /// Decodes a stored record.
    ///
    /// The record comes from the backend and is not trusted: the chunk count
    /// must be between 1 and `MAX_TOTAL_CHUNKS`, and every chunk must hold
    /// at least one byte.
    pub fn from_wire(key: &str, raw: &str) -> Result<Self> {
        let malformed = |reason: String| CacheError::MalformedMetadata {
            key: key.to_string(),
            reason,
        };

        let meta: Self = serde_json::from_str(raw).map_err(|e| malformed(e.to_string()))?;

        if meta.total_chunks == 0 {
            return Err(malformed("totalChunks must be at least 1".to_string()));
        }
        if meta.total_chunks > MAX_TOTAL_CHUNKS {
            return Err(malformed(format!(
                "totalChunks {} exceeds limit of {}",
                meta.total_chunks, MAX_TOTAL_CHUNKS
            )));
        }
        if meta.total_chunks > meta.total_size {
            return Err(malformed(format!(
                "{} chunks cannot hold {} bytes",
                meta.total_chunks, meta.total_size
            )));
        }
        Ok(meta)
    }

    /// Backend keys of every chunk, in index order.
    pub fn chunk_keys(&self, key: &str) -> Vec<String> {
        (0..self.total_chunks).map(|i| chunk_key(key, i)).collect()
    }
}
