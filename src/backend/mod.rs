//! Backend Module
//!
//! Thin clients for the remote key-value service the chunked store writes to.
//!
//! A backend holds no cache state of its own beyond what the service keeps:
//! it moves strings in and out, applies per-key TTLs and reports failures as
//! `CacheError::Backend`. Retry policy belongs to the caller.

mod entry;
mod memory;
mod upstash;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

pub use entry::BackendEntry;
pub use memory::MemoryBackend;
pub use upstash::UpstashBackend;

// == Public Constants ==
/// Hard per-value ceiling of the remote service (1 MiB)
pub const MAX_BACKEND_VALUE_SIZE: usize = 1024 * 1024;

// == Command ==
/// A single write issued as part of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` at `key`, expiring after `ttl` seconds
    Set { key: String, value: String, ttl: u64 },
    /// Remove `key` if present
    Del { key: String },
}

impl Command {
    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl: u64) -> Self {
        Command::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        Command::Del { key: key.into() }
    }

    /// The key this command touches.
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } | Command::Del { key } => key,
        }
    }
}

// == Backend Trait ==
/// Contract every key-value backend provides to the chunked store.
#[async_trait]
pub trait Backend: Send + Sync {
    /// A name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Returns the value at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` at `key` with a TTL in seconds, replacing any prior value.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Removes the given keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Returns true if `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Issues several writes in one round trip.
    ///
    /// Commands are applied in order and are not atomic as a group. When some
    /// fail, the others still take effect and `CacheError::Pipeline` is returned.
    async fn pipeline(&self, commands: Vec<Command>) -> Result<()>;

    /// Checks that the service is reachable.
    async fn ping(&self) -> Result<()>;
}

// == Backend Selection ==
/// Picks the backend for `config`.
///
/// The REST backend is used when credentials are configured and it answers
/// a ping. Otherwise the process falls back to an in-memory backend with
/// the configured value ceiling.
pub async fn connect(config: &Config) -> Arc<dyn Backend> {
    if let Some((url, token)) = config.backend_credentials() {
        match UpstashBackend::new(url, token, config.request_timeout()) {
            Ok(backend) => match backend.ping().await {
                Ok(()) => {
                    info!("Connected to remote backend at {}", url);
                    return Arc::new(backend);
                }
                Err(e) => warn!("Remote backend unreachable, falling back to memory: {}", e),
            },
            Err(e) => warn!("Remote backend unavailable, falling back to memory: {}", e),
        }
    } else {
        warn!("UPSTASH_REDIS_REST_URL/TOKEN not set, using in-memory backend");
    }

    Arc::new(MemoryBackend::with_max_value_size(config.max_value_size))
}
