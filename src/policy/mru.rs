//! Most Recently Used replacement policy.
//!
//! The mirror image of LRU: admission and read hits move entries to the
//! front, and the *front* is evicted. Useful for cyclic access patterns
//! where the most recently used entry is the least likely to be needed
//! again soon.

use std::sync::Arc;

use crate::ds::EntryList;
use crate::entry::CacheEntry;
use crate::policy::{ReplacementPolicy, Retain};

/// MRU eviction: victims are the entries touched most recently.
#[derive(Debug, Default)]
pub struct MruPolicy<K, V> {
    list: EntryList<K, V>,
}

impl<K, V> MruPolicy<K, V> {
    /// Creates a new MRU policy.
    pub fn new() -> Self {
        Self {
            list: EntryList::new(),
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
}

impl<K, V> ReplacementPolicy<K, V> for MruPolicy<K, V> {
    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        self.list.push_front(entry.clone())
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        if self.list.replace(previous, new) {
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
        self.list.move_to_front(entry);
    }

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        self.list.pop_front()
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
