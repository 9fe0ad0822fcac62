//! The single-mutator memory store.
//!
//! A key→entry hash map with dual capacity budgets (entry count and
//! byte-volume), orchestrating a pluggable replacement policy on every
//! mutation and trimming until both budgets hold.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        MemoryStore<K, V>                         │
//! │                                                                  │
//! │  map: FxHashMap<K, Arc<CacheEntry>>      len() ≤ max_size        │
//! │  volume: Σ size(entry)                   volume() ≤ max_volume   │
//! │                                                                  │
//! │   put/get/remove ──► AttributeService (create/update/access)     │
//! │                 ──► ReplacementPolicy (add/replace/touch/…)      │
//! │                 ──► trim loop (policy evict_next or evictor)     │
//! │                 ──► StoreListener (before/after)                 │
//! │   get_or_load   ──► CacheLoader on miss, then the put skeleton   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The put skeleton
//!
//! Every write follows the same state machine:
//!
//! 1. Look up the previous entry; a disabled store (or `put_if_absent`
//!    against a present key) returns it with no other effect.
//! 2. Ask the attribute service for the new entry's attribute map
//!    (`create` for fresh keys, `update` for overwrites).
//! 3. Evaluate the `is_cacheable` predicate; a panic is logged as fatal
//!    and treated as "not cacheable".
//! 4. Consult the policy: `add` for fresh keys, `replace` for overwrites.
//!    The policy picks which entry survives.
//! 5. Reconcile the map and the volume budget with the survivors.
//! 6. Trim until both budgets hold, collecting the evicted batch.
//!
//! ## Invariants
//!
//! At every public-operation boundary (unless the store is disabled):
//!
//! - `len() == |map|` and `volume() == Σ size(entry)` over live entries.
//! - `len() ≤ max_size` and `volume() ≤ max_volume`.
//! - If a policy is installed, its bookkeeping set equals the map values,
//!   and policy-owned slots are live only for entries it currently links.
//!
//! A policy that breaks its contract (a victim the store does not hold, or
//! no victim while the store must shrink) poisons the store: the violation
//! is reported as fatal and every subsequent operation fails with
//! [`StoreError::Poisoned`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::attribute::{well_known, AttributeMap};
use crate::builder::MemoryStoreBuilder;
use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::policy::{PolicyRegistration, ReplacementPolicy, Retain};
use crate::service::{AttributeService, CacheLoader, ExceptionHandler, OpToken, StoreListener};
use crate::store::{RunState, StoreCounters, StoreMetrics};

/// Orders entries for comparator-driven trims; the prefix of the ascending
/// order is evicted first.
pub type EntryComparator<K, V> = Box<dyn Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering>;

pub(crate) type CacheablePredicate<K, V> = Box<dyn Fn(&CacheEntry<K, V>) -> bool + Send>;
pub(crate) type Evictor<K, V> = Box<dyn FnMut(&mut TrimView<K, V>) + Send>;

// ---------------------------------------------------------------------------
// PutResult
// ---------------------------------------------------------------------------

/// Outcome of one mutating operation: the put-skeleton triple.
#[derive(Debug, Clone)]
pub struct PutResult<K, V> {
    /// The entry previously mapped to the key, if any.
    pub previous: Option<Arc<CacheEntry<K, V>>>,
    /// The entry now mapped to the key; `None` when admission was refused
    /// or the operation had no effect.
    pub entry: Option<Arc<CacheEntry<K, V>>>,
    /// Entries removed as a consequence of the operation: trim victims,
    /// or the cleared batch for `clear`.
    pub evicted: Vec<Arc<CacheEntry<K, V>>>,
}

impl<K, V> PutResult<K, V> {
    fn noop(previous: Option<Arc<CacheEntry<K, V>>>) -> Self {
        Self {
            previous,
            entry: None,
            evicted: Vec::new(),
        }
    }

    /// Returns `true` if the operation left a (new) entry in the store.
    pub fn inserted(&self) -> bool {
        self.entry.is_some()
    }
}

// ---------------------------------------------------------------------------
// TrimView
// ---------------------------------------------------------------------------

/// Restricted store view handed to a custom evictor.
///
/// Exposes the current budgets read-only plus the two trim requests; every
/// other setter of the store is out of reach. Requests are recorded and
/// applied by the store after the evictor returns: volume first, then
/// size, sharing the most recently supplied comparator.
pub struct TrimView<K, V> {
    len: usize,
    volume: u64,
    max_size: usize,
    max_volume: u64,
    disabled: bool,
    to_size: Option<isize>,
    to_volume: Option<i64>,
    comparator: Option<EntryComparator<K, V>>,
}

impl<K, V> TrimView<K, V> {
    fn new(len: usize, volume: u64, max_size: usize, max_volume: u64, disabled: bool) -> Self {
        Self {
            len,
            volume,
            max_size,
            max_volume,
            disabled,
            to_size: None,
            to_volume: None,
            comparator: None,
        }
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current volume.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// The entry-count budget.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The volume budget.
    pub fn max_volume(&self) -> u64 {
        self.max_volume
    }

    /// Whether the store is currently disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Requests a trim to `target` entries. Negative targets mean "remove
    /// `|target|` entries"; `isize::MIN` removes everything.
    pub fn trim_to_size(&mut self, target: isize) {
        self.to_size = Some(target);
    }

    /// Like [`trim_to_size`](Self::trim_to_size), evicting the ascending
    /// prefix of `comparator`'s order instead of the policy's choice.
    pub fn trim_to_size_by(
        &mut self,
        target: isize,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) {
        self.to_size = Some(target);
        self.comparator = Some(Box::new(comparator));
    }

    /// Requests a trim to `target` volume. Negative targets mean "reduce
    /// the volume by `|target|`".
    pub fn trim_to_volume(&mut self, target: i64) {
        self.to_volume = Some(target);
    }

    /// Like [`trim_to_volume`](Self::trim_to_volume), with a comparator.
    pub fn trim_to_volume_by(
        &mut self,
        target: i64,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) {
        self.to_volume = Some(target);
        self.comparator = Some(Box::new(comparator));
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Everything a [`MemoryStoreBuilder`] assembles.
pub(crate) struct StoreParts<K, V> {
    pub(crate) max_size: usize,
    pub(crate) max_volume: u64,
    pub(crate) policy: Option<Box<dyn ReplacementPolicy<K, V> + Send>>,
    pub(crate) attributes: Box<dyn AttributeService<K, V> + Send>,
    pub(crate) exceptions: Box<dyn ExceptionHandler<K, V> + Send>,
    pub(crate) listener: Option<Box<dyn StoreListener<K, V> + Send>>,
    pub(crate) loader: Option<Box<dyn CacheLoader<K, V> + Send>>,
    pub(crate) is_cacheable: Option<CacheablePredicate<K, V>>,
    pub(crate) evictor: Option<Evictor<K, V>>,
    pub(crate) disabled: bool,
}

/// Keyed associative store with pluggable replacement and dual budgets.
///
/// # Example
///
/// ```
/// use polycache::builder::MemoryStoreBuilder;
/// use polycache::policy::LruPolicy;
///
/// let mut store = MemoryStoreBuilder::new()
///     .max_size(2)
///     .policy(LruPolicy::new())
///     .build()
///     .unwrap();
///
/// store.put(1, "one").unwrap();
/// store.put(2, "two").unwrap();
/// assert_eq!(store.len(), 2);
///
/// // Overfilling evicts the least recently used entry.
/// let result = store.put(3, "three").unwrap();
/// assert_eq!(*result.evicted[0].key(), 1);
/// assert_eq!(store.len(), 2);
/// ```
pub struct MemoryStore<K, V> {
    map: FxHashMap<K, Arc<CacheEntry<K, V>>>,
    max_size: usize,
    max_volume: u64,
    volume: u64,
    policy: Option<Box<dyn ReplacementPolicy<K, V> + Send>>,
    attributes: Box<dyn AttributeService<K, V> + Send>,
    exceptions: Box<dyn ExceptionHandler<K, V> + Send>,
    listener: Option<Box<dyn StoreListener<K, V> + Send>>,
    loader: Option<Box<dyn CacheLoader<K, V> + Send>>,
    is_cacheable: Option<CacheablePredicate<K, V>>,
    evictor: Option<Evictor<K, V>>,
    disabled: bool,
    state: RunState,
    counters: StoreCounters,
}

impl<K, V> fmt::Debug for MemoryStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.map.len())
            .field("max_size", &self.max_size)
            .field("max_volume", &self.max_volume)
            .field("volume", &self.volume)
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl<K, V> MemoryStore<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    /// Returns a builder for configuring a store.
    pub fn builder() -> MemoryStoreBuilder<K, V> {
        MemoryStoreBuilder::new()
    }

    pub(crate) fn from_parts(parts: StoreParts<K, V>) -> Self {
        Self {
            map: FxHashMap::default(),
            max_size: parts.max_size,
            max_volume: parts.max_volume,
            volume: 0,
            policy: parts.policy,
            attributes: parts.attributes,
            exceptions: parts.exceptions,
            listener: parts.listener,
            loader: parts.loader,
            is_cacheable: parts.is_cacheable,
            evictor: parts.evictor,
            disabled: parts.disabled,
            state: RunState::New,
            counters: StoreCounters::default(),
        }
    }

    // -- Lifecycle --------------------------------------------------------

    /// Starts the store: runs policy attribute registration and freezes the
    /// attribute set. Called implicitly by the first public operation.
    pub fn start(&mut self) -> Result<(), StoreError> {
        match self.state {
            RunState::New => {
                let mut reg = PolicyRegistration::new();
                let registered = match self.policy.as_mut() {
                    Some(policy) => policy.register(&mut reg),
                    None => Ok(()),
                };
                if let Err(err) = registered {
                    return Err(self.poison(&format!("policy attribute registration failed: {err}")));
                }
                for attr in reg.hard() {
                    if let Err(err) = self.attributes.depend_on_hard(attr.clone()) {
                        return Err(
                            self.poison(&format!("policy attribute registration failed: {err}"))
                        );
                    }
                }
                for attr in reg.soft() {
                    if let Err(err) = self.attributes.depend_on_soft(attr.clone()) {
                        return Err(
                            self.poison(&format!("policy attribute registration failed: {err}"))
                        );
                    }
                }
                self.attributes.freeze();
                self.state = RunState::Running;
                Ok(())
            },
            RunState::Running => Ok(()),
            RunState::Shutdown | RunState::Terminated => Err(StoreError::Shutdown),
            RunState::Poisoned => Err(StoreError::Poisoned),
        }
    }

    /// Rejects future mutations; reads stay answered.
    pub fn shutdown(&mut self) {
        if self.state != RunState::Terminated {
            self.state = RunState::Shutdown;
        }
    }

    /// Drops the contents and stops answering.
    pub fn terminate(&mut self) {
        self.map.clear();
        self.volume = 0;
        if let Some(policy) = self.policy.as_mut() {
            policy.clear();
        }
        self.state = RunState::Terminated;
    }

    /// Returns the current lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.state
    }

    fn lazy_start(&mut self) -> Result<(), StoreError> {
        match self.state {
            RunState::New => self.start(),
            RunState::Running => Ok(()),
            RunState::Shutdown | RunState::Terminated => Err(StoreError::Shutdown),
            RunState::Poisoned => Err(StoreError::Poisoned),
        }
    }

    fn poison(&mut self, message: &str) -> StoreError {
        self.state = RunState::Poisoned;
        self.exceptions.fatal(message, None);
        StoreError::Poisoned
    }

    // -- Reads ------------------------------------------------------------

    /// Looks up an entry without touching attributes or the policy.
    ///
    /// Stays callable after shutdown.
    pub fn peek(&self, key: &K) -> Option<Arc<CacheEntry<K, V>>> {
        self.map.get(key).cloned()
    }

    /// Looks up an entry; a hit records the access with the attribute
    /// service and the policy.
    pub fn get(&mut self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        let entry = self.map.get(key).cloned();
        match &entry {
            Some(entry) => {
                self.counters.inc_hit();
                self.attributes.access(entry.attributes());
                if let Some(policy) = self.policy.as_mut() {
                    policy.touch(entry);
                }
            },
            None => self.counters.inc_miss(),
        }
        Ok(entry)
    }

    /// Looks up an entry, invoking the configured loader on a miss.
    ///
    /// A loaded value is inserted through the normal put skeleton (policy
    /// admission and trims included), so the returned entry is `None` when
    /// the loader found nothing or admission refused the loaded value.
    /// Loader failures route through the exception handler, which may
    /// substitute a value; otherwise they surface as
    /// [`StoreError::LoadFailed`].
    pub fn get_or_load(&mut self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        if let Some(entry) = self.map.get(key).cloned() {
            self.counters.inc_hit();
            self.attributes.access(entry.attributes());
            if let Some(policy) = self.policy.as_mut() {
                policy.touch(&entry);
            }
            return Ok(Some(entry));
        }
        self.counters.inc_miss();
        if self.loader.is_none() {
            return Ok(None);
        }

        let token = OpToken::Load { key };
        self.notify_before(&token);
        let loaded = match self.loader.as_mut() {
            Some(loader) => loader.load(key, AttributeMap::empty()),
            None => Ok(None),
        };
        match loaded {
            Ok(None) => {
                self.notify_after(&token, &PutResult::noop(None));
                Ok(None)
            },
            Ok(Some((value, attrs))) => {
                let outcome = self.put_entry(key.clone(), value, &attrs, false)?;
                self.notify_after(&token, &outcome);
                Ok(outcome.entry)
            },
            Err(cause) => {
                let substitute =
                    self.exceptions
                        .load_failed(cause.as_ref(), key, AttributeMap::empty());
                match substitute {
                    Some(value) => {
                        let outcome =
                            self.put_entry(key.clone(), value, AttributeMap::empty(), false)?;
                        self.notify_after(&token, &outcome);
                        Ok(outcome.entry)
                    },
                    None => Err(StoreError::LoadFailed(cause)),
                }
            },
        }
    }

    /// Returns `true` if the key is present. Does not touch access state.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the entry count.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the sum of the `size` attribute over live entries.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Returns the entry-count budget.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the volume budget.
    pub fn max_volume(&self) -> u64 {
        self.max_volume
    }

    /// Returns `true` if writes are currently ignored.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Iterates over the live entries, in the hash map's iteration order,
    /// the same order the no-policy eviction fallback consumes.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CacheEntry<K, V>>> {
        self.map.values()
    }

    /// Returns a snapshot of the activity counters.
    pub fn metrics(&self) -> StoreMetrics {
        self.counters.snapshot()
    }

    // -- Writes -----------------------------------------------------------

    /// Inserts or overwrites `key`, returning the put-skeleton triple.
    pub fn put(&mut self, key: K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.put_with_attributes(key, value, AttributeMap::empty())
    }

    /// Inserts or overwrites `key` with caller-supplied attributes.
    pub fn put_with_attributes(
        &mut self,
        key: K,
        value: V,
        attrs: &AttributeMap,
    ) -> Result<PutResult<K, V>, StoreError> {
        self.lazy_start()?;
        let token_key = key.clone();
        let token = OpToken::Put {
            key: &token_key,
            only_if_absent: false,
        };
        self.notify_before(&token);
        let outcome = self.put_entry(key, value, attrs, false)?;
        self.notify_after(&token, &outcome);
        Ok(outcome)
    }

    /// Inserts `key` only if it is absent; a present key is returned as
    /// `previous` with no other effect.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.lazy_start()?;
        let token_key = key.clone();
        let token = OpToken::Put {
            key: &token_key,
            only_if_absent: true,
        };
        self.notify_before(&token);
        let outcome = self.put_entry(key, value, AttributeMap::empty(), true)?;
        self.notify_after(&token, &outcome);
        Ok(outcome)
    }

    /// Applies the put skeleton to every pair, in iteration order.
    ///
    /// Semantics match N individual puts: admission is decided per entry,
    /// listener events fire per entry, and trims run per entry.
    pub fn put_all(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<PutResult<K, V>>, StoreError> {
        self.lazy_start()?;
        let mut results = Vec::new();
        for (key, value) in entries {
            let token_key = key.clone();
            let token = OpToken::Put {
                key: &token_key,
                only_if_absent: false,
            };
            self.notify_before(&token);
            let outcome = self.put_entry(key, value, AttributeMap::empty(), false)?;
            self.notify_after(&token, &outcome);
            results.push(outcome);
        }
        Ok(results)
    }

    /// Replaces the value of an existing key unconditionally.
    ///
    /// A missing key is a no-op: `previous` and `entry` are both `None`.
    pub fn replace(&mut self, key: &K, value: V) -> Result<PutResult<K, V>, StoreError> {
        self.lazy_start()?;
        let token = OpToken::Replace { key };
        self.notify_before(&token);
        let outcome = if self.map.contains_key(key) {
            self.put_entry(key.clone(), value, AttributeMap::empty(), false)?
        } else {
            PutResult::noop(None)
        };
        self.notify_after(&token, &outcome);
        Ok(outcome)
    }

    /// Replaces the value of `key` only if the current value equals
    /// `expected`. Succeeded iff [`PutResult::inserted`] on the outcome.
    pub fn replace_if_equals(
        &mut self,
        key: &K,
        expected: &V,
        value: V,
    ) -> Result<PutResult<K, V>, StoreError>
    where
        V: PartialEq,
    {
        self.replace_with_attributes(key, Some(expected), value, AttributeMap::empty())
    }

    /// The full compare-and-swap form: replaces `key`'s value (and
    /// attributes) when `expected` is `None` or equals the current value.
    pub fn replace_with_attributes(
        &mut self,
        key: &K,
        expected: Option<&V>,
        value: V,
        attrs: &AttributeMap,
    ) -> Result<PutResult<K, V>, StoreError>
    where
        V: PartialEq,
    {
        self.lazy_start()?;
        let token = OpToken::Replace { key };
        self.notify_before(&token);
        let current = self.map.get(key).cloned();
        let matches = match (&current, expected) {
            (Some(_), None) => true,
            (Some(entry), Some(expected)) => entry.value() == expected,
            (None, _) => false,
        };
        let outcome = if matches {
            self.put_entry(key.clone(), value, attrs, false)?
        } else {
            PutResult::noop(current)
        };
        self.notify_after(&token, &outcome);
        Ok(outcome)
    }

    /// Removes `key`, returning the removed entry.
    pub fn remove(&mut self, key: &K) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        let token = OpToken::Remove { key };
        self.notify_before(&token);
        let entry = self.map.remove(key);
        if let Some(entry) = &entry {
            self.drop_entry(entry, false);
            self.counters.inc_remove();
        }
        let outcome = PutResult {
            previous: entry.clone(),
            entry: None,
            evicted: Vec::new(),
        };
        self.notify_after(&token, &outcome);
        Ok(entry)
    }

    /// Removes `key` only if its current value equals `value`.
    pub fn remove_if_value(
        &mut self,
        key: &K,
        value: &V,
    ) -> Result<Option<Arc<CacheEntry<K, V>>>, StoreError>
    where
        V: PartialEq,
    {
        self.lazy_start()?;
        let matches = self
            .map
            .get(key)
            .is_some_and(|entry| entry.value() == value);
        if matches {
            self.remove(key)
        } else {
            Ok(None)
        }
    }

    /// Removes every present key of `keys`, returning the removed entries.
    pub fn remove_all(
        &mut self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        let mut removed = Vec::new();
        for key in keys {
            if let Some(entry) = self.remove(&key)? {
                removed.push(entry);
            }
        }
        Ok(removed)
    }

    /// Removes every entry, returning them as a batch. Volume drops to
    /// zero and the policy is reset.
    pub fn clear(&mut self) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        self.notify_before(&OpToken::Clear);
        let entries: Vec<_> = self.map.drain().map(|(_, entry)| entry).collect();
        self.volume = 0;
        if let Some(policy) = self.policy.as_mut() {
            policy.clear();
        }
        let outcome = PutResult {
            previous: None,
            entry: None,
            evicted: entries,
        };
        self.notify_after(&OpToken::Clear, &outcome);
        Ok(outcome.evicted)
    }

    /// Enables or disables the store. A disabled store answers reads but
    /// silently ignores writes.
    pub fn set_disabled(&mut self, disabled: bool) -> Result<(), StoreError> {
        self.lazy_start()?;
        self.disabled = disabled;
        Ok(())
    }

    /// Updates the entry-count budget, trimming immediately if the new
    /// budget is exceeded. Zero is rejected.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        if max_size == 0 {
            return Err(StoreError::InvalidCapacity(
                "max_size must be > 0".to_string(),
            ));
        }
        self.lazy_start()?;
        self.max_size = max_size;
        self.trim()
    }

    /// Updates the volume budget, trimming immediately if the new budget
    /// is exceeded. Zero is rejected.
    pub fn set_max_volume(
        &mut self,
        max_volume: u64,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        if max_volume == 0 {
            return Err(StoreError::InvalidCapacity(
                "max_volume must be > 0".to_string(),
            ));
        }
        self.lazy_start()?;
        self.max_volume = max_volume;
        self.trim()
    }

    // -- Explicit trims ---------------------------------------------------

    /// Trims to `target` entries. Non-negative targets are an absolute
    /// count; negative targets remove `|target|` entries; `isize::MIN`
    /// removes everything.
    pub fn trim_to_size(&mut self, target: isize) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        self.notify_before(&OpToken::Trim);
        let mut evicted = Vec::new();
        self.trim_size_inner(&mut evicted, target, None)?;
        let outcome = PutResult {
            previous: None,
            entry: None,
            evicted,
        };
        self.notify_after(&OpToken::Trim, &outcome);
        Ok(outcome.evicted)
    }

    /// Trims to `target` entries, evicting the ascending prefix of
    /// `comparator`'s order.
    pub fn trim_to_size_by(
        &mut self,
        target: isize,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        self.notify_before(&OpToken::Trim);
        let boxed: EntryComparator<K, V> = Box::new(comparator);
        let mut evicted = Vec::new();
        self.trim_size_inner(&mut evicted, target, Some(&boxed))?;
        let outcome = PutResult {
            previous: None,
            entry: None,
            evicted,
        };
        self.notify_after(&OpToken::Trim, &outcome);
        Ok(outcome.evicted)
    }

    /// Trims to `target` volume. Negative targets reduce the volume by
    /// `|target|`.
    pub fn trim_to_volume(&mut self, target: i64) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        self.notify_before(&OpToken::Trim);
        let mut evicted = Vec::new();
        self.trim_volume_inner(&mut evicted, target, None)?;
        let outcome = PutResult {
            previous: None,
            entry: None,
            evicted,
        };
        self.notify_after(&OpToken::Trim, &outcome);
        Ok(outcome.evicted)
    }

    /// Trims to `target` volume with a comparator.
    pub fn trim_to_volume_by(
        &mut self,
        target: i64,
        comparator: impl Fn(&CacheEntry<K, V>, &CacheEntry<K, V>) -> Ordering + 'static,
    ) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        self.lazy_start()?;
        self.notify_before(&OpToken::Trim);
        let boxed: EntryComparator<K, V> = Box::new(comparator);
        let mut evicted = Vec::new();
        self.trim_volume_inner(&mut evicted, target, Some(&boxed))?;
        let outcome = PutResult {
            previous: None,
            entry: None,
            evicted,
        };
        self.notify_after(&OpToken::Trim, &outcome);
        Ok(outcome.evicted)
    }

    // -- Internals --------------------------------------------------------

    fn entry_volume(entry: &CacheEntry<K, V>) -> u64 {
        let size = entry.attributes().get(well_known::size());
        if size > 0 {
            size as u64
        } else {
            0
        }
    }

    /// The put skeleton shared by put/put_if_absent/put_all/replace and the
    /// loader insert path. Callers have already fired `before`.
    fn put_entry(
        &mut self,
        key: K,
        value: V,
        attrs: &AttributeMap,
        only_if_absent: bool,
    ) -> Result<PutResult<K, V>, StoreError> {
        let previous = self.map.get(&key).cloned();
        if self.disabled || (only_if_absent && previous.is_some()) {
            return Ok(PutResult::noop(previous));
        }

        let map_attrs = match &previous {
            None => self.attributes.create(&key, &value, attrs),
            Some(prev) => self.attributes.update(&key, &value, attrs, prev.attributes()),
        };
        let entry = Arc::new(CacheEntry::new(key.clone(), value, map_attrs));

        let mut keep_new = true;
        if let Some(predicate) = &self.is_cacheable {
            keep_new = match catch_unwind(AssertUnwindSafe(|| predicate(&entry))) {
                Ok(cacheable) => cacheable,
                Err(_) => {
                    self.exceptions
                        .fatal("is-cacheable predicate panicked, entry was not cached", None);
                    false
                },
            };
        }

        let mut keep_existing = false;
        let mut policy_informed = false;
        if keep_new {
            if let Some(policy) = self.policy.as_mut() {
                policy_informed = true;
                match &previous {
                    None => keep_new = policy.add(&entry),
                    Some(prev) => match policy.replace(prev, &entry) {
                        Retain::New => {},
                        Retain::Previous => {
                            keep_existing = true;
                            keep_new = false;
                        },
                        Retain::Neither => keep_new = false,
                    },
                }
            }
        }

        if let Some(prev) = &previous {
            if !keep_existing {
                self.drop_entry(prev, policy_informed);
                if !keep_new {
                    self.map.remove(&key);
                }
            }
        }

        let mut evicted = Vec::new();
        let new_entry = if keep_new {
            self.volume += Self::entry_volume(&entry);
            if previous.is_some() {
                self.counters.inc_update();
            } else {
                self.counters.inc_insert();
            }
            self.map.insert(key, entry.clone());
            evicted = self.trim()?;
            Some(entry)
        } else {
            None
        };

        Ok(PutResult {
            previous,
            entry: new_entry,
            evicted,
        })
    }

    /// Subtracts an entry's volume and, unless the policy already learned
    /// of its departure (eviction or replace), informs it.
    fn drop_entry(&mut self, entry: &Arc<CacheEntry<K, V>>, policy_informed: bool) {
        self.volume = self.volume.saturating_sub(Self::entry_volume(entry));
        if !policy_informed {
            if let Some(policy) = self.policy.as_mut() {
                policy.remove(entry);
            }
        }
    }

    /// Evicts one entry: the policy's choice, or, with no policy, the
    /// first entry in map iteration order (the order `iter()` exposes).
    fn evict_next(&mut self) -> Result<Arc<CacheEntry<K, V>>, StoreError> {
        if let Some(policy) = self.policy.as_mut() {
            let victim = match policy.evict_next() {
                Some(victim) => victim,
                None => {
                    return Err(self.poison(
                        "replacement policy produced no victim while the store must shrink",
                    ))
                },
            };
            match self.map.remove(victim.key()) {
                Some(held) if Arc::ptr_eq(&held, &victim) => {
                    self.volume = self.volume.saturating_sub(Self::entry_volume(&victim));
                    self.counters.inc_eviction();
                    Ok(victim)
                },
                Some(held) => {
                    // Reinstate the innocent entry before failing.
                    self.map.insert(held.key().clone(), held);
                    Err(self.poison("replacement policy evicted an entry the store does not hold"))
                },
                None => {
                    Err(self.poison("replacement policy evicted an entry the store does not hold"))
                },
            }
        } else {
            let key = match self.map.keys().next() {
                Some(key) => key.clone(),
                None => return Err(self.poison("eviction requested on an empty store")),
            };
            let Some(entry) = self.map.remove(&key) else {
                return Err(self.poison("eviction requested on an empty store"));
            };
            self.volume = self.volume.saturating_sub(Self::entry_volume(&entry));
            self.counters.inc_eviction();
            Ok(entry)
        }
    }

    /// Evicts until both budgets hold. With a custom evictor configured,
    /// each loop iteration consults it; an iteration that shrinks nothing
    /// gets a warning and one forced eviction, guaranteeing progress.
    fn trim(&mut self) -> Result<Vec<Arc<CacheEntry<K, V>>>, StoreError> {
        let mut evicted = Vec::new();
        while self.map.len() > self.max_size || self.volume > self.max_volume {
            if self.evictor.is_some() {
                let mut view = TrimView::new(
                    self.map.len(),
                    self.volume,
                    self.max_size,
                    self.max_volume,
                    self.disabled,
                );
                if let Some(evictor) = self.evictor.as_mut() {
                    evictor(&mut view);
                }
                let TrimView {
                    to_size,
                    to_volume,
                    comparator,
                    ..
                } = view;
                let before = evicted.len();
                if let Some(target) = to_volume {
                    self.trim_volume_inner(&mut evicted, target, comparator.as_ref())?;
                }
                if let Some(target) = to_size {
                    self.trim_size_inner(&mut evicted, target, comparator.as_ref())?;
                }
                if evicted.len() == before {
                    self.exceptions
                        .warning("custom evictor failed to shrink the store, evicting one entry");
                    let entry = self.evict_next()?;
                    evicted.push(entry);
                }
            } else {
                let entry = self.evict_next()?;
                evicted.push(entry);
            }
        }
        Ok(evicted)
    }

    fn trim_size_inner(
        &mut self,
        out: &mut Vec<Arc<CacheEntry<K, V>>>,
        target: isize,
        comparator: Option<&EntryComparator<K, V>>,
    ) -> Result<(), StoreError> {
        let current = self.map.len();
        let trim_count = if target == isize::MIN {
            current
        } else if target >= 0 {
            current.saturating_sub(target as usize)
        } else {
            current.min(target.unsigned_abs())
        };
        if trim_count == 0 {
            return Ok(());
        }
        match comparator {
            None => {
                for _ in 0..trim_count {
                    let entry = self.evict_next()?;
                    out.push(entry);
                }
            },
            Some(comparator) => {
                let mut all: Vec<_> = self.map.values().cloned().collect();
                all.sort_by(|a, b| comparator(a.as_ref(), b.as_ref()));
                for entry in all.into_iter().take(trim_count) {
                    self.map.remove(entry.key());
                    self.drop_entry(&entry, false);
                    self.counters.inc_eviction();
                    out.push(entry);
                }
            },
        }
        Ok(())
    }

    fn trim_volume_inner(
        &mut self,
        out: &mut Vec<Arc<CacheEntry<K, V>>>,
        target: i64,
        comparator: Option<&EntryComparator<K, V>>,
    ) -> Result<(), StoreError> {
        let trim_to: u64 = if target >= 0 {
            target as u64
        } else {
            self.volume.saturating_sub(target.unsigned_abs())
        };
        match comparator {
            None => {
                while self.volume > trim_to {
                    let entry = self.evict_next()?;
                    out.push(entry);
                }
            },
            Some(comparator) => {
                let mut all: Vec<_> = self.map.values().cloned().collect();
                all.sort_by(|a, b| comparator(a.as_ref(), b.as_ref()));
                let mut idx = 0;
                while self.volume > trim_to && idx < all.len() {
                    let entry = all[idx].clone();
                    idx += 1;
                    self.map.remove(entry.key());
                    self.drop_entry(&entry, false);
                    self.counters.inc_eviction();
                    out.push(entry);
                }
            },
        }
        Ok(())
    }

    // -- Listener ---------------------------------------------------------

    fn notify_before(&self, token: &OpToken<'_, K>) {
        if let Some(listener) = &self.listener {
            if catch_unwind(AssertUnwindSafe(|| listener.before(token))).is_err() {
                self.exceptions
                    .warning("store listener panicked in before hook");
            }
        }
    }

    fn notify_after(&self, token: &OpToken<'_, K>, outcome: &PutResult<K, V>) {
        if let Some(listener) = &self.listener {
            if catch_unwind(AssertUnwindSafe(|| listener.after(token, outcome))).is_err() {
                self.exceptions
                    .warning("store listener panicked in after hook");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MemoryStoreBuilder;
    use crate::policy::{FifoPolicy, LruPolicy, UnlimitedPolicy};

    fn store() -> MemoryStore<u64, &'static str> {
        MemoryStoreBuilder::new().build().unwrap()
    }

    #[test]
    fn put_then_get_returns_the_value() {
        let mut store = store();
        let result = store.put(1, "one").unwrap();
        assert!(result.inserted());
        assert!(result.previous.is_none());
        assert_eq!(store.get(&1).unwrap().map(|e| *e.value()), Some("one"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.volume(), 1);
    }

    #[test]
    fn overwrite_surfaces_the_previous_entry() {
        let mut store = store();
        let first = store.put(1, "one").unwrap().entry.unwrap();
        let second = store.put(1, "two").unwrap();
        assert!(Arc::ptr_eq(second.previous.as_ref().unwrap(), &first));
        assert_eq!(store.len(), 1);
        assert_eq!(store.volume(), 1);
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("two"));
    }

    #[test]
    fn remove_then_get_misses() {
        let mut store = store();
        store.put(1, "one").unwrap();
        let removed = store.remove(&1).unwrap();
        assert_eq!(removed.map(|e| *e.value()), Some("one"));
        assert_eq!(store.get(&1).unwrap(), None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.volume(), 0);
    }

    #[test]
    fn remove_if_value_checks_the_value() {
        let mut store = store();
        store.put(1, "one").unwrap();
        assert!(store.remove_if_value(&1, &"other").unwrap().is_none());
        assert!(store.contains(&1));
        assert!(store.remove_if_value(&1, &"one").unwrap().is_some());
        assert!(!store.contains(&1));
    }

    #[test]
    fn clear_empties_everything() {
        let mut store = store();
        store.put(1, "one").unwrap();
        store.put(2, "two").unwrap();
        let cleared = store.clear().unwrap();
        assert_eq!(cleared.len(), 2);
        assert_eq!(store.len(), 0);
        assert_eq!(store.volume(), 0);
        assert_eq!(store.peek(&1), None);
        assert_eq!(store.peek(&2), None);
    }

    #[test]
    fn disabled_store_ignores_writes() {
        let mut store: MemoryStore<u64, &str> =
            MemoryStoreBuilder::new().disabled(true).build().unwrap();
        let result = store.put(1, "one").unwrap();
        assert!(result.previous.is_none());
        assert!(result.entry.is_none());
        assert!(result.evicted.is_empty());
        assert_eq!(store.get(&1).unwrap(), None);
        assert_eq!(store.len(), 0);

        // Re-enabling lets writes through again.
        store.set_disabled(false).unwrap();
        store.put(1, "one").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_if_absent_preserves_the_present_value() {
        let mut store = store();
        store.put(1, "one").unwrap();
        let result = store.put_if_absent(1, "two").unwrap();
        assert!(!result.inserted());
        assert_eq!(result.previous.as_ref().map(|e| *e.value()), Some("one"));
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("one"));

        let fresh = store.put_if_absent(2, "two").unwrap();
        assert!(fresh.inserted());
    }

    #[test]
    fn volume_tracks_the_size_attribute() {
        let mut store = store();
        let mut attrs = AttributeMap::new();
        attrs.try_put(well_known::size(), 4).unwrap();
        store.put_with_attributes(1, "a", &attrs).unwrap();
        store.put_with_attributes(2, "b", &attrs).unwrap();
        assert_eq!(store.volume(), 8);
        store.remove(&1).unwrap();
        assert_eq!(store.volume(), 4);
    }

    #[test]
    fn no_policy_fallback_evicts_in_iteration_order() {
        let mut store: MemoryStore<u64, &str> =
            MemoryStoreBuilder::new().max_size(3).build().unwrap();
        store.put(1, "a").unwrap();
        store.put(2, "b").unwrap();
        store.put(3, "c").unwrap();
        // The documented fallback victim is the first entry in the same
        // iteration order `iter()` exposes.
        let first_in_iter = *store.iter().next().unwrap().key();
        let evicted = store.set_max_size(2).unwrap();
        assert_eq!(evicted.len(), 1);
        assert_eq!(*evicted[0].key(), first_in_iter);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replace_requires_presence() {
        let mut store = store();
        let absent = store.replace(&1, "one").unwrap();
        assert!(absent.previous.is_none() && absent.entry.is_none());
        assert_eq!(store.len(), 0);

        store.put(1, "one").unwrap();
        let replaced = store.replace(&1, "two").unwrap();
        assert!(replaced.inserted());
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("two"));
    }

    #[test]
    fn replace_if_equals_is_a_compare_and_swap() {
        let mut store = store();
        store.put(1, "one").unwrap();

        let miss = store.replace_if_equals(&1, &"wrong", "two").unwrap();
        assert!(!miss.inserted());
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("one"));

        let hit = store.replace_if_equals(&1, &"one", "two").unwrap();
        assert!(hit.inserted());
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("two"));
    }

    /// Admission policy that pins whatever was admitted first: `replace`
    /// always retains the previous entry.
    struct PinningPolicy;

    impl ReplacementPolicy<u64, &'static str> for PinningPolicy {
        fn add(&mut self, _entry: &Arc<CacheEntry<u64, &'static str>>) -> bool {
            true
        }

        fn replace(
            &mut self,
            _previous: &Arc<CacheEntry<u64, &'static str>>,
            _new: &Arc<CacheEntry<u64, &'static str>>,
        ) -> Retain {
            Retain::Previous
        }

        fn remove(&mut self, _entry: &Arc<CacheEntry<u64, &'static str>>) {}

        fn evict_next(&mut self) -> Option<Arc<CacheEntry<u64, &'static str>>> {
            None
        }

        fn clear(&mut self) {}
    }

    #[test]
    fn policy_may_retain_the_previous_entry_on_replace() {
        let mut store = MemoryStoreBuilder::new().policy(PinningPolicy).build().unwrap();
        let mut attrs = AttributeMap::new();
        attrs.try_put(well_known::size(), 3).unwrap();
        let first = store
            .put_with_attributes(1, "one", &attrs)
            .unwrap()
            .entry
            .unwrap();

        // The policy overrides the caller's put: the old entry survives,
        // the new one is dropped.
        let result = store.put(1, "two").unwrap();
        assert!(!result.inserted());
        assert!(result.evicted.is_empty());
        assert!(Arc::ptr_eq(result.previous.as_ref().unwrap(), &first));

        let held = store.peek(&1).unwrap();
        assert!(Arc::ptr_eq(&held, &first));
        assert_eq!(*held.value(), "one");
        assert_eq!(held.get(well_known::size()), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.volume(), 3);
    }

    #[test]
    fn non_cacheable_entries_are_refused_and_displace_the_previous() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .is_cacheable(|entry| *entry.value() != "reject")
            .build()
            .unwrap();
        store.put(1, "keep").unwrap();
        let result = store.put(1, "reject").unwrap();
        assert!(!result.inserted());
        assert!(result.previous.is_some());
        // The old mapping is gone: the put displaced it even though the
        // replacement was refused.
        assert_eq!(store.peek(&1), None);
        assert_eq!(store.volume(), 0);
    }

    #[test]
    fn panicking_predicate_counts_as_not_cacheable() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .is_cacheable(|entry| {
                if *entry.key() == 13 {
                    panic!("boom");
                }
                true
            })
            .build()
            .unwrap();
        store.put(1, "fine").unwrap();
        let result = store.put(13, "cursed").unwrap();
        assert!(!result.inserted());
        assert_eq!(store.len(), 1);
        // The store stays fully usable.
        store.put(2, "fine").unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn trim_to_size_zero_empties_the_store() {
        let mut store = store();
        for k in 0..5 {
            store.put(k, "v").unwrap();
        }
        let evicted = store.trim_to_size(0).unwrap();
        assert_eq!(evicted.len(), 5);
        assert_eq!(store.len(), 0);
        assert_eq!(store.volume(), 0);
    }

    #[test]
    fn negative_trim_targets_remove_that_many() {
        let mut store = store();
        for k in 0..5 {
            store.put(k, "v").unwrap();
        }
        let evicted = store.trim_to_size(-2).unwrap();
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.len(), 3);

        // isize::MIN is the remove-everything sentinel.
        let rest = store.trim_to_size(isize::MIN).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(store.is_empty());
    }

    #[test]
    fn comparator_trim_evicts_the_ascending_prefix() {
        let mut store = store();
        for k in [3u64, 1, 4, 5, 2] {
            store.put(k, "v").unwrap();
        }
        let evicted = store
            .trim_to_size_by(3, |a, b| a.key().cmp(b.key()))
            .unwrap();
        let mut gone: Vec<_> = evicted.iter().map(|e| *e.key()).collect();
        gone.sort_unstable();
        assert_eq!(gone, vec![1, 2]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn trim_to_volume_respects_negative_deltas() {
        let mut store = store();
        let mut attrs = AttributeMap::new();
        attrs.try_put(well_known::size(), 5).unwrap();
        for k in 0..4 {
            store.put_with_attributes(k, "v", &attrs).unwrap();
        }
        assert_eq!(store.volume(), 20);
        let evicted = store.trim_to_volume(-10).unwrap();
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.volume(), 10);
    }

    #[test]
    fn policy_that_never_evicts_poisons_the_store_under_pressure() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(1)
            .policy(UnlimitedPolicy::new())
            .build()
            .unwrap();
        store.put(1, "one").unwrap();
        let err = store.put(2, "two").unwrap_err();
        assert!(err.is_poisoned());
        assert_eq!(store.run_state(), RunState::Poisoned);
        assert!(store.put(3, "three").unwrap_err().is_poisoned());
        assert!(store.get(&1).unwrap_err().is_poisoned());
    }

    #[test]
    fn shutdown_rejects_mutations_but_answers_reads() {
        let mut store = store();
        store.put(1, "one").unwrap();
        store.shutdown();
        assert!(store.put(2, "two").unwrap_err().is_shutdown());
        assert!(store.remove(&1).unwrap_err().is_shutdown());
        assert!(store.get(&1).unwrap_err().is_shutdown());
        // Reads that bypass access tracking stay available.
        assert_eq!(store.peek(&1).map(|e| *e.value()), Some("one"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.volume(), 1);
    }

    #[test]
    fn terminate_drops_the_contents() {
        let mut store = store();
        store.put(1, "one").unwrap();
        store.terminate();
        assert_eq!(store.run_state(), RunState::Terminated);
        assert_eq!(store.peek(&1), None);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn lazy_start_happens_on_first_op() {
        let mut store = store();
        assert_eq!(store.run_state(), RunState::New);
        store.put(1, "one").unwrap();
        assert_eq!(store.run_state(), RunState::Running);
    }

    #[test]
    fn set_max_size_trims_immediately() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(4)
            .policy(FifoPolicy::new())
            .build()
            .unwrap();
        for k in 1..=4 {
            store.put(k, "v").unwrap();
        }
        let evicted = store.set_max_size(2).unwrap();
        assert_eq!(evicted.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(matches!(
            store.set_max_size(0),
            Err(StoreError::InvalidCapacity(_))
        ));
    }

    #[test]
    fn custom_evictor_requests_are_applied() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(3)
            .policy(FifoPolicy::new())
            .evictor(|view| {
                let target = (view.max_size() / 2) as isize;
                view.trim_to_size(target);
            })
            .build()
            .unwrap();
        for k in 1..=3 {
            store.put(k, "v").unwrap();
        }
        let result = store.put(4, "v").unwrap();
        // Overfilled to 4; the evictor asked for size 1.
        assert_eq!(result.evicted.len(), 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn no_progress_evictor_falls_back_to_one_eviction() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(2)
            .policy(FifoPolicy::new())
            .evictor(|_view| {
                // Asks for nothing.
            })
            .build()
            .unwrap();
        for k in 1..=2 {
            store.put(k, "v").unwrap();
        }
        let result = store.put(3, "v").unwrap();
        assert_eq!(result.evicted.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn metrics_count_the_basics() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(2)
            .policy(LruPolicy::new())
            .build()
            .unwrap();
        store.put(1, "a").unwrap();
        store.put(1, "b").unwrap();
        store.put(2, "c").unwrap();
        assert!(store.get(&1).unwrap().is_some());
        assert!(store.get(&9).unwrap().is_none());
        assert!(store.remove(&2).unwrap().is_some());
        store.put(3, "d").unwrap();
        store.put(4, "e").unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.inserts, 4);
        assert_eq!(metrics.updates, 1);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.removes, 1);
        assert_eq!(metrics.evictions, 1);
    }

    #[test]
    fn put_all_matches_individual_puts() {
        let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new()
            .max_size(2)
            .policy(FifoPolicy::new())
            .build()
            .unwrap();
        let results = store.put_all(vec![(1, "a"), (2, "b"), (3, "c")]).unwrap();
        assert_eq!(results.len(), 3);
        // The third put evicted the first, exactly as three single puts.
        assert_eq!(results[2].evicted.len(), 1);
        assert_eq!(*results[2].evicted[0].key(), 1);
        assert_eq!(store.len(), 2);
    }
}
