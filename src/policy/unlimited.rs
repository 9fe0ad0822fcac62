//! The always-admitting, never-evicting policy.
//!
//! Admits every entry and keeps no bookkeeping. Intended for stores whose
//! budgets are effectively unbounded; if the store ever needs a victim,
//! `evict_next` has nothing to offer and returns `None`, which the store
//! treats as a contract violation (fatal, poisoned store). Pair it with
//! real capacity limits at your own peril.

use std::sync::Arc;

use crate::entry::CacheEntry;
use crate::policy::{ReplacementPolicy, Retain};

/// Admits everything, proposes no victims.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlimitedPolicy;

impl UnlimitedPolicy {
    /// Creates the policy.
    pub fn new() -> Self {
        Self
    }
}

impl<K, V> ReplacementPolicy<K, V> for UnlimitedPolicy {
    fn add(&mut self, _entry: &Arc<CacheEntry<K, V>>) -> bool {
        true
    }

    fn replace(
        &mut self,
        _previous: &Arc<CacheEntry<K, V>>,
        _new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        Retain::New
    }

    fn remove(&mut self, _entry: &Arc<CacheEntry<K, V>>) {}

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        None
    }

    fn clear(&mut self) {}
}
