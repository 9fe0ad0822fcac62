//! Least Frequently Used replacement policy.
//!
//! Each entry carries a hit counter in a policy-private attribute slot.
//! `touch` increments it, and `evict_next` picks the entry with the lowest
//! count, breaking ties by insertion order (oldest wins).
//!
//! Victim selection scans the tracked entries, so eviction is O(n) in the
//! store size. That keeps tie-breaking exact; workloads that evict far more
//! often than they hit are better served by [`LruPolicy`](crate::policy::LruPolicy)
//! or [`ClockPolicy`](crate::policy::ClockPolicy).

use std::sync::Arc;

use crate::attribute::Attribute;
use crate::ds::EntryList;
use crate::entry::CacheEntry;
use crate::error::RegistrationError;
use crate::policy::{PolicyRegistration, ReplacementPolicy, Retain};

/// LFU eviction: victims are the entries with the fewest read hits.
#[derive(Debug)]
pub struct LfuPolicy<K, V> {
    /// Insertion-ordered (front = oldest); ties resolve to the front-most.
    list: EntryList<K, V>,
    hits: Attribute<i64>,
}

impl<K, V> LfuPolicy<K, V> {
    /// Creates a new LFU policy.
    pub fn new() -> Self {
        Self {
            list: EntryList::new(),
            hits: Attribute::with_validator("lfu.hits", 0, |v| *v >= 0),
        }
    }

    /// Returns the number of entries currently tracked.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns the recorded hit count for `entry`.
    pub fn frequency(&self, entry: &CacheEntry<K, V>) -> i64 {
        entry.attributes().get(&self.hits)
    }
}

impl<K, V> Default for LfuPolicy<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ReplacementPolicy<K, V> for LfuPolicy<K, V> {
    fn register(&mut self, reg: &mut PolicyRegistration) -> Result<(), RegistrationError> {
        reg.depend_hard(&self.hits)
    }

    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        self.list.push_back(entry.clone())
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        let count = previous.attributes().get(&self.hits);
        if self.list.replace(previous, new) {
            new.attributes().set(&self.hits, count);
            Retain::New
        } else if self.add(new) {
            Retain::New
        } else {
            Retain::Neither
        }
    }

    fn remove(&mut self, entry: &Arc<CacheEntry<K, V>>) {
        self.list.remove(entry);
    }

    fn touch(&mut self, entry: &Arc<CacheEntry<K, V>>) {
        entry.attributes().add_long(&self.hits, 1);
    }

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        let mut victim: Option<Arc<CacheEntry<K, V>>> = None;
        let mut min = i64::MAX;
        for e in self.list.iter() {
            let count = e.attributes().get(&self.hits);
            // Strict comparison keeps the first (oldest) of the minimums.
            if count < min {
                min = count;
                victim = Some(e.clone());
            }
        }
        let victim = victim?;
        self.list.remove(&victim);
        Some(victim)
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
