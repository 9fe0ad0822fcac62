//! The memory store: key→entry map, capacity budgets, and orchestration.
//!
//! [`MemoryStore`] is the single-mutator core. The feature-gated
//! [`SyncMemoryStore`](crate::store::sync::SyncMemoryStore) wraps every
//! public operation in a `parking_lot::Mutex` critical section without
//! changing any contract.

pub mod memory;

#[cfg(feature = "concurrency")]
pub mod sync;

pub use memory::{EntryComparator, MemoryStore, PutResult, TrimView};

#[cfg(feature = "concurrency")]
pub use sync::SyncMemoryStore;

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a store.
///
/// Any public operation lazily starts a `New` store. `Shutdown` rejects
/// mutations but keeps reads (`peek`, `len`, `volume`, the getters)
/// callable; `Terminated` drops the contents as well. `Poisoned` is entered
/// on a policy contract violation and rejects everything: the store must be
/// rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet started.
    New,
    /// Started; attribute registration is frozen.
    Running,
    /// Mutations rejected, reads still answered.
    Shutdown,
    /// Contents dropped, nothing answered.
    Terminated,
    /// Unusable after a policy contract violation.
    Poisoned,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Snapshot of store-level activity counters.
///
/// All fields are cumulative since store creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    /// Successful lookups via `get`/`get_or_load`.
    pub hits: u64,
    /// Failed lookups via `get`/`get_or_load`.
    pub misses: u64,
    /// New key insertions.
    pub inserts: u64,
    /// Value updates for existing keys.
    pub updates: u64,
    /// Explicit removals.
    pub removes: u64,
    /// Entries evicted by trims.
    pub evictions: u64,
}

/// Internal counters; atomics so snapshots work through shared references.
#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    evictions: AtomicU64,
}

impl StoreCounters {
    pub(crate) fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}
