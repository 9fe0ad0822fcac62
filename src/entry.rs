//! Cache entries: the immutable `{key, value, attributes}` triple.
//!
//! Entries are created by the store at insert time and shared behind `Arc`
//! between the hash map, the installed policy, and callers. Replacing a
//! value produces a new entry; the old one is discarded rather than
//! mutated.
//!
//! Equality and hashing follow the map-entry convention: two entries are
//! equal iff their keys and values are equal. Attribute contents never
//! participate.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::attribute::{Attribute, AttributeMap};

/// Sentinel for "not linked into any policy structure".
const UNLINKED: usize = usize::MAX;

/// An immutable key-value-attributes triple.
///
/// # Example
///
/// ```
/// use polycache::attribute::{well_known, AttributeMap};
/// use polycache::entry::CacheEntry;
///
/// let mut attrs = AttributeMap::new();
/// attrs.try_put(well_known::size(), 128).unwrap();
///
/// let entry = CacheEntry::new("config", "{}", attrs);
/// assert_eq!(*entry.key(), "config");
/// assert_eq!(*entry.value(), "{}");
/// assert_eq!(entry.get(well_known::size()), 128);
/// assert_eq!(entry.get(well_known::hits()), 0); // default
/// ```
pub struct CacheEntry<K, V> {
    key: K,
    value: V,
    attrs: AttributeMap,
    /// Slot index assigned by the installed policy while this entry is
    /// linked into its bookkeeping structure; `UNLINKED` otherwise.
    slot: AtomicUsize,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates a new entry.
    pub fn new(key: K, value: V, attrs: AttributeMap) -> Self {
        Self {
            key,
            value,
            attrs,
            slot: AtomicUsize::new(UNLINKED),
        }
    }

    /// Returns the entry key.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the entry value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns the attribute map attached to this entry.
    #[inline]
    pub fn attributes(&self) -> &AttributeMap {
        &self.attrs
    }

    /// Returns the value of `attr` for this entry, falling back to the
    /// descriptor default.
    #[inline]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, attr: &Attribute<T>) -> T {
        self.attrs.get(attr)
    }

    /// Returns the policy slot index, if this entry is currently linked.
    #[inline]
    pub(crate) fn policy_slot(&self) -> Option<usize> {
        match self.slot.load(Ordering::Relaxed) {
            UNLINKED => None,
            idx => Some(idx),
        }
    }

    /// Records the policy slot index for this entry.
    #[inline]
    pub(crate) fn set_policy_slot(&self, idx: usize) {
        debug_assert_ne!(idx, UNLINKED);
        self.slot.store(idx, Ordering::Relaxed);
    }

    /// Clears the policy slot index.
    #[inline]
    pub(crate) fn clear_policy_slot(&self) {
        self.slot.store(UNLINKED, Ordering::Relaxed);
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for CacheEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl<K: Eq, V: Eq> Eq for CacheEntry<K, V> {}

impl<K: std::hash::Hash, V: std::hash::Hash> std::hash::Hash for CacheEntry<K, V> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CacheEntry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}={:?} {:?}", self.key, self.value, self.attrs)
    }
}
