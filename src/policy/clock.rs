//! Clock (second-chance) replacement policy.
//!
//! Approximates LRU without list reshuffling on hits. Entries carry a
//! reference bit in a policy-private attribute slot; `touch` sets it, and
//! `evict_next` sweeps from the hand position, clearing set bits and giving
//! those entries a second chance, until it finds a cleared bit.
//!
//! ```text
//!   hand ─► [a:1] [b:0] [c:1] [d:0]
//!
//!   sweep: a has its bit set → clear, rotate behind the hand
//!          b has a cleared bit → evict b
//! ```
//!
//! The reference bit is a hard dependency: the attribute service reserves
//! the slot in every entry map, so `touch` updates it in place. Freshly
//! admitted entries start with a cleared bit; only read hits set it.

use std::sync::Arc;

use crate::attribute::Attribute;
use crate::ds::EntryList;
use crate::entry::CacheEntry;
use crate::error::RegistrationError;
use crate::policy::{PolicyRegistration, ReplacementPolicy, Retain};

/// Clock eviction: one reference bit per entry, swept by a rotating hand.
#[derive(Debug)]
pub struct ClockPolicy<K, V> {
    list: EntryList<K, V>,
    referenced: Attribute<bool>,
}

impl<K, V> ClockPolicy<K, V> {
    /// Creates a new Clock policy.
    pub fn new() -> Self {
        Self {
            list: EntryList::new(),
            referenced: Attribute::new("clock.referenced", false),
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

    /// Returns `true` if `entry` currently has its reference bit set.
    pub fn is_referenced(&self, entry: &CacheEntry<K, V>) -> bool {
        entry.attributes().get(&self.referenced)
    }
}

impl<K, V> Default for ClockPolicy<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ReplacementPolicy<K, V> for ClockPolicy<K, V> {
    fn register(&mut self, reg: &mut PolicyRegistration) -> Result<(), RegistrationError> {
        reg.depend_hard(&self.referenced)
    }

    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool {
        self.list.push_back(entry.clone())
    }

    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        let referenced = previous.attributes().get(&self.referenced);
        if self.list.replace(previous, new) {
            new.attributes().set(&self.referenced, referenced);
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
        entry.attributes().set(&self.referenced, true);
    }

    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>> {
        // Each pass either evicts or clears one set bit, so the sweep
        // terminates after at most one full rotation.
        loop {
            let front = self.list.front()?.clone();
            if front.attributes().get(&self.referenced) {
                front.attributes().set(&self.referenced, false);
                self.list.move_to_back(&front);
            } else {
                return self.list.pop_front();
            }
        }
    }

    fn clear(&mut self) {
        self.list.clear();
    }
}
