//! In-Memory Backend Module
//!
//! A process-local stand-in for the remote key-value service, used in
//! development and tests. Mirrors the remote limits that matter to the
//! chunked store: a per-value size ceiling and per-key TTL expiry.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Backend, BackendEntry, Command, MAX_BACKEND_VALUE_SIZE};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// Key-value storage with TTL and a value size ceiling.
///
/// Expired entries are dropped lazily when touched, the way the remote
/// service hides them from readers.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: RwLock<HashMap<String, BackendEntry>>,
    /// Largest value accepted by `set`
    max_value_size: usize,
}

impl MemoryBackend {
    // == Constructor ==
    /// Creates a backend enforcing the default 1 MiB value ceiling.
    pub fn new() -> Self {
        Self::with_max_value_size(MAX_BACKEND_VALUE_SIZE)
    }

    /// Creates a backend enforcing the given value ceiling in bytes.
    pub fn with_max_value_size(max_value_size: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_value_size,
        }
    }

    /// Returns all live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Returns the number of live keys.
    pub async fn len(&self) -> usize {
        self.keys().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining TTL in seconds for a live key.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(BackendEntry::ttl_remaining)
    }

    // == Validation ==
    fn check_set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::backend("SET", "key cannot be empty"));
        }
        if ttl_seconds == 0 {
            return Err(CacheError::backend("SET", "invalid expire time"));
        }
        if value.len() > self.max_value_size {
            return Err(CacheError::backend(
                "SET",
                format!(
                    "max request size exceeded: value of {} bytes, limit {} bytes",
                    value.len(),
                    self.max_value_size
                ),
            ));
        }
        Ok(())
    }

    fn apply(
        &self,
        entries: &mut HashMap<String, BackendEntry>,
        command: Command,
    ) -> Result<()> {
        match command {
            Command::Set { key, value, ttl } => {
                self.check_set(&key, &value, ttl)?;
                entries.insert(key, BackendEntry::new(value, ttl));
            }
            Command::Del { key } => {
                entries.remove(&key);
            }
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it under the write lock
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(BackendEntry::is_expired) {
            entries.remove(key);
            debug!("memory backend: expired key {} removed on access", key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.check_set(key, value, ttl_seconds)?;

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            BackendEntry::new(value.to_string(), ttl_seconds),
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn pipeline(&self, commands: Vec<Command>) -> Result<()> {
        let total = commands.len();
        let mut failures = Vec::new();

        let mut entries = self.entries.write().await;
        for command in commands {
            if let Err(e) = self.apply(&mut entries, command) {
                failures.push(e.to_string());
            }
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(CacheError::Pipeline {
                failed: failures.len(),
                total,
                first_error: first.clone(),
            }),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
