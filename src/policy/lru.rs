//! Least Recently Used replacement policy.
//!
//! Entries are linked to the front on admission and moved back to the front
//! on every read hit; the victim is the back of the list, i.e. the entry
//! untouched for the longest time.
//!
//! ## Example
//!
//! ```
//! use polycache::builder::MemoryStoreBuilder;
//! use polycache::policy::LruPolicy;
//!
//! let mut store = MemoryStoreBuilder::new()
//!     .max_size(2)
//!     .policy(LruPolicy::new())
//!     .build()
//!     .unwrap();
//!
//! store.put(1, "a").unwrap();
//! store.put(2, "b").unwrap();
//! assert!(store.get(&1).unwrap().is_some()); // refresh 1
//! let result = store.put(3, "c").unwrap();
//!
//! // 2 was the least recently used.
//! assert_eq!(*result.evicted[0].key(), 2);
//! ```

use std::sync::Arc;

use crate::ds::EntryList;
use crate::entry::CacheEntry;
use crate::policy::{ReplacementPolicy, Retain};

/// LRU eviction: victims are the entries untouched the longest.
#[derive(Debug, Default)]
pub struct LruPolicy<K, V> {
    list: EntryList<K, V>,
}

impl<K, V> LruPolicy<K, V> {
    /// Creates a new LRU policy.
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

impl<K, V> ReplacementPolicy<K, V> for LruPolicy<K, V> {
    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        self.list.push_front(entry.clone())
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        // Transplant in place; a value overwrite does not count as a hit.
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
        self.list.pop_back()
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
