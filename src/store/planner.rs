//! Chunk Planner Module
//!
//! Decides how a serialized payload is laid out across backend keys.

use super::MAX_TOTAL_CHUNKS;
use crate::error::{CacheError, Result};

// == Chunk Plan ==
/// Boundaries of a payload split into fixed-size chunks.
///
/// Every chunk except possibly the last is exactly `chunk_size` bytes, and
/// concatenating the chunks in index order yields the original payload.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlan<'a> {
    payload: &'a str,
    chunk_size: usize,
}

impl<'a> ChunkPlan<'a> {
    /// Plans `payload` in chunks of at most `chunk_size` bytes.
    ///
    /// Payloads needing more than one chunk must be ASCII so that byte
    /// boundaries are character boundaries; canonical payloads always are.
    pub fn new(payload: &'a str, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CacheError::InvalidRequest(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        if payload.len() > chunk_size && !payload.is_ascii() {
            return Err(CacheError::Serialization(
                "Only ASCII payloads can be split into chunks".to_string(),
            ));
        }

        let plan = Self {
            payload,
            chunk_size,
        };
        if plan.total_chunks() > MAX_TOTAL_CHUNKS {
            return Err(CacheError::InvalidRequest(format!(
                "Value needs {} chunks, limit is {}",
                plan.total_chunks(),
                MAX_TOTAL_CHUNKS
            )));
        }
        Ok(plan)
    }

    /// Number of chunks: `max(1, ceil(len / chunk_size))`.
    pub fn total_chunks(&self) -> usize {
        self.payload.len().div_ceil(self.chunk_size).max(1)
    }

    /// Serialized length of the whole payload in bytes.
    pub fn total_size(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload fits in a single value.
    pub fn is_single(&self) -> bool {
        self.total_chunks() == 1
    }

    /// Chunk slices in index order.
    pub fn chunks(&self) -> impl DoubleEndedIterator<Item = &'a str> + 'a {
        let payload = self.payload;
        let chunk_size = self.chunk_size;
        (0..self.total_chunks()).map(move |i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(payload.len());
            &payload[start..end]
        })
    }
}
