//! Chunked Store Module
//!
//! Persists values larger than the backend's per-value ceiling by splitting
//! their serialized form across several keys.
//!
//! # Key layout
//! - `{key}` - the whole payload, when it fits in one chunk (simple path)
//! - `{key}:meta` - chunk count, size and creation time (chunked path only)
//! - `{key}:chunk:{i}` - the i-th slice of the payload, `i` in `0..totalChunks`

mod chunk_store;
mod metadata;
mod planner;
mod serializer;
mod stats;


// Re-export public types
pub use chunk_store::{ChunkStore, StorageMode, StoreReceipt};
pub use metadata::ChunkMetadata;
pub use planner::ChunkPlan;
pub use serializer::{
    decode_canonical, deserialize, encode_canonical, serialize, CacheValue, Payload,
};
pub use stats::{StatsSnapshot, StoreStats};

use crate::error::{CacheError, Result};

// == Public Constants ==
/// Default chunk size, leaving headroom under the 1 MiB backend ceiling
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 900 * 1024;

/// Maximum allowed logical key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Most chunks a single entry may span (about 57 GiB at the default chunk size)
pub const MAX_TOTAL_CHUNKS: usize = 65_536;

const META_SUFFIX: &str = ":meta";
const CHUNK_INFIX: &str = ":chunk:";

// == Key Naming ==
/// Backend key of the metadata record for `key`.
pub fn meta_key(key: &str) -> String {
    format!("{}{}", key, META_SUFFIX)
}

/// Backend key of chunk `index` for `key`.
pub fn chunk_key(key: &str, index: usize) -> String {
    format!("{}{}{}", key, CHUNK_INFIX, index)
}

/// Rejects keys that are empty, too long, or collide with the derived key layout.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.ends_with(META_SUFFIX) || key.contains(CHUNK_INFIX) {
        return Err(CacheError::InvalidRequest(format!(
            "Key '{}' uses a reserved suffix",
            key
        )));
    }
    Ok(())
}
