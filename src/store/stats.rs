//! Store Statistics Module
//!
//! Tracks read and write outcomes of the chunked store.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Store Stats ==
/// Lock-free counters shared by every clone of a store.
#[derive(Debug, Default)]
pub struct StoreStats {
    hits: AtomicU64,
    misses: AtomicU64,
    simple_writes: AtomicU64,
    chunked_writes: AtomicU64,
    chunks_written: AtomicU64,
    deletes: AtomicU64,
    corrupt_reads: AtomicU64,
    failures: AtomicU64,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_simple_write(&self) {
        self.simple_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunked_write(&self, chunks: usize) {
        self.chunked_writes.fetch_add(1, Ordering::Relaxed);
        self.chunks_written.fetch_add(chunks as u64, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// A chunked entry was found missing a chunk or carrying bad metadata.
    pub fn record_corrupt_read(&self) {
        self.corrupt_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        StatsSnapshot {
            hits,
            misses,
            simple_writes: self.simple_writes.load(Ordering::Relaxed),
            chunked_writes: self.chunked_writes.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            corrupt_reads: self.corrupt_reads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of the store counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Successful retrievals
    pub hits: u64,
    /// Retrievals that found nothing usable
    pub misses: u64,
    /// Entries written via the simple path
    pub simple_writes: u64,
    /// Entries written via the chunked path
    pub chunked_writes: u64,
    /// Chunk keys written across all chunked writes
    pub chunks_written: u64,
    pub deletes: u64,
    /// Chunked entries read back incomplete or with bad metadata
    pub corrupt_reads: u64,
    /// Operations that failed on backend or encoding errors
    pub failures: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}
