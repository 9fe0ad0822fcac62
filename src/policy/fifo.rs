//! First In, First Out replacement policy.
//!
//! Entries are linked to the front of an intrusive list on admission and
//! evicted from the back, so the victim is always the longest-resident
//! entry. Read hits have no effect on eviction order.
//!
//! ## Example
//!
//! ```
//! use polycache::builder::MemoryStoreBuilder;
//! use polycache::policy::FifoPolicy;
//!
//! let mut store = MemoryStoreBuilder::new()
//!     .max_size(2)
//!     .policy(FifoPolicy::new())
//!     .build()
//!     .unwrap();
//!
//! store.put(1, "a").unwrap();
//! store.put(2, "b").unwrap();
//! let result = store.put(3, "c").unwrap();
//!
//! // The oldest entry was evicted.
//! assert_eq!(result.evicted.len(), 1);
//! assert_eq!(*result.evicted[0].key(), 1);
//! ```

use std::sync::Arc;

use crate::ds::EntryList;
use crate::entry::CacheEntry;
use crate::policy::{ReplacementPolicy, Retain};

/// FIFO eviction: victims leave in insertion order.
#[derive(Debug, Default)]
pub struct FifoPolicy<K, V> {
    list: EntryList<K, V>,
}

impl<K, V> FifoPolicy<K, V> {
    /// Creates a new FIFO policy.
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

impl<K, V> ReplacementPolicy<K, V> for FifoPolicy<K, V> {
    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        self.list.push_front(entry.clone())
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        // The new entry inherits the previous entry's residence time.
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

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        self.list.pop_back()
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
