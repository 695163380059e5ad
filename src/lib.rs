//! Chunk Cache - large values on size-limited key-value caches
//!
//! Stores values of any size on a TTL-based key-value service with a hard
//! per-value ceiling by splitting them into chunks plus a metadata record.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use backend::{Backend, MemoryBackend, UpstashBackend};
pub use config::Config;
pub use error::CacheError;
pub use store::{CacheValue, ChunkStore};
