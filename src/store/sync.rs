//! Synchronized store wrapper.
//!
//! Wraps every public operation of a [`MemoryStore`] in a
//! `parking_lot::Mutex` critical section. No contract changes: one mutator
//! at a time, exactly as the unsynchronized variant assumes; the lock just
//! enforces it across threads.
//!
//! Returned entries are `Arc`s, so they remain usable after the lock is
//! released. For multi-step operations that must be atomic together, use
//! [`SyncMemoryStore::with`].

use std::cmp::Ordering;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attribute::AttributeMap;
use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::store::{MemoryStore, PutResult, RunState, StoreMetrics};

/// Thread-safe wrapper serializing all access to a [`MemoryStore`].
pub struct SyncMemoryStore<K, V> {
    inner: Mutex<MemoryStore<K, V>>,
}

impl<K, V> SyncMemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Wraps a store.
    pub fn new(store: MemoryStore<K, V>) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    // -- Writes -----------------------------------------------------------

    /// Inserts or overwrites `key`.
    pub fn put(&self, key: K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.inner.lock().put(key, value)
    }

    /// Inserts or overwrites `key` with caller-supplied attributes.
    pub fn put_with_attributes(
        &self,
        key: K,
        value: V,
        attrs: &AttributeMap,
    ) -> Result<PutResult<K, V>, StoreError> {
        self.inner.lock().put_with_attributes(key, value, attrs)
    }

    /// Inserts `key` only if absent.
    pub fn put_if_absent(&self, key: K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.inner.lock().put_if_absent(key, value)
    }

    /// Applies the put skeleton to every pair, under one lock acquisition.
    pub fn put_all(
        &self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<PutResult<K, V>>, StoreError> {
        self.inner.lock().put_all(entries)
    }

    /// Replaces the value of an existing key unconditionally.
    pub fn replace(&self, key: &K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.inner.lock().replace(key, value)
    }

    /// Replaces the value of `key` only if the current value equals
    /// `expected`.
    pub fn replace_if_equals(
        &self,
        key: &K,
        expected: &V,
        value: V,
    ) -> Result<PutResult<K, V>, StoreError>
    where
        V: PartialEq,
    {
        self.inner.lock().replace_if_equals(key, expected, value)
    }

    /// The full compare-and-swap form of replace.
    pub fn replace_with_attributes(
        &self,
        key: &K,
        expected: Option<&V>,
        value: V,
        attrs: &AttributeMap,
    ) -> Result<PutResult<K, V>, StoreError>
    where
        V: PartialEq,
    {
        self.inner
            .lock()
            .replace_with_attributes(key, expected, value, attrs)
    }

    /// Removes `key`.
    pub fn remove(&self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().remove(key)
    }

    /// Removes `key` only if its current value equals `value`.
    pub fn remove_if_value(
        &self,
        key: &K,
        value: &V,
    ) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError>
    where
        V: PartialEq,
    {
        self.inner.lock().remove_if_value(key, value)
    }

    /// Removes every present key of `keys`, under one lock acquisition.
    pub fn remove_all(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().remove_all(keys)
    }

    /// Removes every entry.
    pub fn clear(&self) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().clear()
    }

    // -- Reads ------------------------------------------------------------

    /// Looks up an entry, recording the access.
    pub fn get(&self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().get(key)
    }

    /// Looks up an entry, invoking the loader on a miss.
    pub fn get_or_load(&self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().get_or_load(key)
    }

    /// Looks up an entry without recording the access.
    pub fn peek(&self, key: &K) -> Option<Arc<CacheEntry<K, V>>> {
        self.inner.lock().peek(key)
    }

    /// Returns `true` if the key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Returns the entry count.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the current volume.
    pub fn volume(&self) -> u64 {
        self.inner.lock().volume()
    }

    /// Returns the entry-count budget.
    pub fn max_size(&self) -> usize {
        self.inner.lock().max_size()
    }

    /// Returns the volume budget.
    pub fn max_volume(&self) -> u64 {
        self.inner.lock().max_volume()
    }

    /// Returns `true` if writes are currently ignored.
    pub fn is_disabled(&self) -> bool {
        self.inner.lock().is_disabled()
    }

    /// Returns a snapshot of the live entries, in the store's iteration
    /// order. The lock is released before the iterator is consumed.
    pub fn iter(&self) -> impl Iterator<Item = Arc<CacheEntry<K, V>>> {
        self.inner
            .lock()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Returns a snapshot of the activity counters.
    pub fn metrics(&self) -> StoreMetrics {
        self.inner.lock().metrics()
    }

    // -- Budgets & configuration ------------------------------------------

    /// Enables or disables the store.
    pub fn set_disabled(&self, disabled: bool) -> Result<(), StoreError> {
        self.inner.lock().set_disabled(disabled)
    }

    /// Updates the entry-count budget, trimming immediately.
    pub fn set_max_size(&self, max_size: usize) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().set_max_size(max_size)
    }

    /// Updates the volume budget, trimming immediately.
    pub fn set_max_volume(
        &self,
        max_volume: u64,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().set_max_volume(max_volume)
    }

    // -- Explicit trims ---------------------------------------------------

    /// Trims to `target` entries.
    pub fn trim_to_size(&self, target: isize) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().trim_to_size(target)
    }

    /// Trims to `target` entries with a comparator.
    pub fn trim_to_size_by(
        &self,
        target: isize,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().trim_to_size_by(target, comparator)
    }

    /// Trims to `target` volume.
    pub fn trim_to_volume(&self, target: i64) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().trim_to_volume(target)
    }

    /// Trims to `target` volume with a comparator.
    pub fn trim_to_volume_by(
        &self,
        target: i64,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.inner.lock().trim_to_volume_by(target, comparator)
    }

    // -- Lifecycle --------------------------------------------------------

    /// Returns the current lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.inner.lock().run_state()
    }

    /// Rejects future mutations.
    pub fn shutdown(&self) {
        self.inner.lock().shutdown();
    }

    /// Drops the contents and stops answering.
    pub fn terminate(&self) {
        self.inner.lock().terminate();
    }

    /// Runs `f` with the store locked, for multi-step atomic sections.
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryStore<K, V>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
