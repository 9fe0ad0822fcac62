//! Replacement policies: admission and victim selection.
//!
//! A [`ReplacementPolicy`] cooperates with the memory store on every
//! mutation. The store owns the key→entry map and the capacity budgets; the
//! policy owns the eviction order and any per-entry bookkeeping it needs,
//! which it keeps either in the intrusive [`EntryList`](crate::ds::EntryList)
//! scaffold or in attribute slots it registers before the store starts.
//!
//! ## Callback protocol
//!
//! | Op | Called when | Contract |
//! |----|-------------|----------|
//! | `register` | once, at store start | declare attribute dependencies |
//! | `add` | a new key is inserted | may reject admission |
//! | `replace` | an existing key is overwritten | picks which entry survives |
//! | `remove` | an entry leaves for any reason other than eviction | drop bookkeeping |
//! | `touch` | a read hit | update recency/frequency |
//! | `evict_next` | the store must shrink | must yield an entry it holds |
//! | `clear` | the store is cleared | reset bookkeeping |
//!
//! These callbacks are the only points at which a policy may mutate its
//! private attribute slots. `evict_next` returning `None` while the store
//! holds entries is a contract violation: the store logs it as fatal and
//! poisons itself.
//!
//! ## Shipped policies
//!
//! [`FifoPolicy`], [`LruPolicy`], [`MruPolicy`], [`ClockPolicy`],
//! [`LfuPolicy`], [`RandomPolicy`], and the always-admitting
//! [`UnlimitedPolicy`].

pub mod clock;
pub mod fifo;
pub mod lfu;
pub mod lru;
pub mod mru;
pub mod random;
pub mod unlimited;

pub use clock::ClockPolicy;
pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use lru::LruPolicy;
pub use mru::MruPolicy;
pub use random::RandomPolicy;
pub use unlimited::UnlimitedPolicy;

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::attribute::{AnyAttribute, Attribute};
use crate::entry::CacheEntry;
use crate::error::RegistrationError;

/// Which entry survives a `replace` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retain {
    /// Keep the new entry; the previous one is dropped.
    New,
    /// Keep the previous entry; the caller's put is overridden.
    Previous,
    /// Keep neither; the key leaves the store.
    Neither,
}

/// Collector for a policy's attribute dependencies.
///
/// A *hard* dependency is materialized by the attribute service in every
/// entry map it creates, so the slot can be updated in place on every
/// write. A *soft* dependency is best-effort: the slot may be sparse and is
/// only read. Registering the same attribute twice (hard or soft) fails.
pub struct PolicyRegistration {
    hard: Vec<AnyAttribute>,
    soft: Vec<AnyAttribute>,
    seen: FxHashSet<u64>,
}

impl PolicyRegistration {
    /// Creates an empty registration.
    pub fn new() -> Self {
        Self {
            hard: Vec::new(),
            soft: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    /// Declares a hard dependency on `attr`.
    pub fn depend_hard<T: Clone + Send + Sync + 'static>(
        &mut self,
        attr: &Attribute<T>,
    ) -> Result<(), RegistrationError> {
        if !self.seen.insert(attr.id()) {
            return Err(RegistrationError::Duplicate(attr.name().to_string()));
        }
        self.hard.push(attr.erased());
        Ok(())
    }

    /// Declares a soft dependency on `attr`.
    pub fn depend_soft<T: Clone + Send + Sync + 'static>(
        &mut self,
        attr: &Attribute<T>,
    ) -> Result<(), RegistrationError> {
        if !self.seen.insert(attr.id()) {
            return Err(RegistrationError::Duplicate(attr.name().to_string()));
        }
        self.soft.push(attr.erased());
        Ok(())
    }

    /// Returns the hard dependencies declared so far.
    pub(crate) fn hard(&self) -> &[AnyAttribute] {
        &self.hard
    }

    /// Returns the soft dependencies declared so far.
    pub(crate) fn soft(&self) -> &[AnyAttribute] {
        &self.soft
    }
}

impl Default for PolicyRegistration {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides which entries are admitted and which entry is evicted next.
pub trait ReplacementPolicy<K, V> {
    /// Declares the attributes this policy depends on.
    ///
    /// Called exactly once, when the store starts. The default declares
    /// nothing.
    fn register(&mut self, _reg: &mut PolicyRegistration) -> Result<(), RegistrationError> {
        Ok(())
    }

    /// Offers a new entry for admission. Returning `false` rejects it; the
    /// store will not insert it.
    fn add(&mut self, entry: &Arc<CacheEntry<K, V>>) -> bool;

    /// Decides the fate of an overwritten key.
    ///
    /// The default drops the previous entry's bookkeeping and offers the
    /// new entry through [`add`](Self::add). List-based policies override
    /// this with an O(1) transplant that preserves the previous entry's
    /// position.
    fn replace(
        &mut self,
        previous: &Arc<CacheEntry<K, V>>,
        new: &Arc<CacheEntry<K, V>>,
    ) -> Retain {
        self.remove(previous);
        if self.add(new) {
            Retain::New
        } else {
            Retain::Neither
        }
    }

    /// Drops bookkeeping for an entry the store removed for any reason
    /// other than eviction.
    fn remove(&mut self, entry: &Arc<CacheEntry<K, V>>);

    /// Records a read hit. The default does nothing.
    fn touch(&mut self, _entry: &Arc<CacheEntry<K, V>>) {}

    /// Picks the next victim. Must return an entry this policy currently
    /// holds; `None` while the store still holds entries is a contract
    /// violation.
    fn evict_next(&mut self) -> Option<Arc<CacheEntry<K, V>>>;

    /// Resets all bookkeeping.
    fn clear(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let attr = Attribute::new("bit", false);
        let mut reg = PolicyRegistration::new();
        reg.depend_hard(&attr).unwrap();
        let err = reg.depend_soft(&attr).unwrap_err();
        assert_eq!(err, RegistrationError::Duplicate("bit".to_string()));
        assert_eq!(reg.hard().len(), 1);
        assert!(reg.soft().is_empty());
    }

    #[test]
    fn distinct_attributes_register_independently() {
        let a = Attribute::new("a", 0i64);
        let b = Attribute::new("b", 0i64);
        let mut reg = PolicyRegistration::new();
        reg.depend_hard(&a).unwrap();
        reg.depend_soft(&b).unwrap();
        assert_eq!(reg.hard().len(), 1);
        assert_eq!(reg.soft().len(), 1);
    }
}
