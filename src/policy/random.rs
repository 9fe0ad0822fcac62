//! Random replacement policy.
//!
//! Victims are selected uniformly at random. No access-pattern tracking, no
//! ordering: a dense vector of tracked entries with swap-remove gives O(1)
//! admission, removal, and eviction. Each entry's policy slot stores its
//! current vector index.
//!
//! The RNG is an internal XorShift64: deterministic from a seed, no
//! external dependency, usable under Miri. Mostly useful as a baseline
//! to compare smarter policies against.

use std::sync::Arc;

use crate::entry::CacheEntry;
use crate::policy::{ReplacementPolicy, Retain};

const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Random eviction over a dense entry vector.
#[derive(Debug)]
pub struct RandomPolicy<K, V> {
    entries: Vec<Arc<CacheEntry<K, V>>>,
    state: u64,
}

impl<K, V> RandomPolicy<K, V> {
    /// Creates a new policy with the default seed.
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Creates a new policy with an explicit seed, for deterministic tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            entries: Vec::new(),
            // XorShift state must be non-zero.
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    /// Returns the number of entries currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Resolves the vector index recorded in `entry`, verifying identity.
    fn index_of(&self, entry: &Arc<CacheEntry<K, V>>) -> Option<usize> {
        let idx = entry.policy_slot()?;
        match self.entries.get(idx) {
            Some(held) if Arc::ptr_eq(held, entry) => Some(idx),
            _ => None,
        }
    }

    /// Swap-removes the entry at `idx`, fixing the moved entry's index.
    fn take_at(&mut self, idx: usize) -> Arc<CacheEntry<K, V>> {
        let victim = self.entries.swap_remove(idx);
        victim.clear_policy_slot();
        if let Some(moved) = self.entries.get(idx) {
            moved.set_policy_slot(idx);
        }
        victim
    }
}

impl<K, V> Default for RandomPolicy<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ReplacementPolicy<K, V> for RandomPolicy<K, V> {
    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        if entry.policy_slot().is_some() {
            return false;
        }
        entry.set_policy_slot(self.entries.len());
        self.entries.push(entry.clone());
        true
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        match self.index_of(previous) {
            Some(idx) => {
                self.entries[idx] = new.clone();
                previous.clear_policy_slot();
                new.set_policy_slot(idx);
                Retain::New
            },
            None => {
                if self.add(new) {
                    Retain::New
                } else {
                    Retain::Neither
                }
            },
        }
    }

    fn remove(&mut self, entry: &Arc<CacheEntry<K, V>>) {
        if let Some(idx) = self.index_of(entry) {
            self.take_at(idx);
        }
    }

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = (self.next_u64() % self.entries.len() as u64) as usize;
        Some(self.take_at(idx))
    }

    fn clear(&mut self) {
        for entry in &self.entries {
            entry.clear_policy_slot();
        }
        self.entries.clear();
    }
}
