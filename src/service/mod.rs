//! Collaborator interfaces consumed by the memory store.
//!
//! The store is wired by explicit construction: each collaborator is a
//! boxed trait object handed to the
//! [`MemoryStoreBuilder`](crate::builder::MemoryStoreBuilder). This module
//! defines the contracts; [`DefaultAttributeService`] and
//! [`DefaultExceptionHandler`] are the shipped implementations.
//!
//! - [`AttributeService`]: creates and maintains entry attribute maps.
//! - [`ExceptionHandler`]: the warning/fatal channel, plus load-failure
//!   recovery.
//! - [`CacheLoader`]: read-through value production on misses.
//! - [`StoreListener`]: the fire-and-forget before/after mutation channel.

pub mod attributes;
pub mod exceptions;

pub use attributes::DefaultAttributeService;
pub use exceptions::DefaultExceptionHandler;

use crate::attribute::{AnyAttribute, AttributeMap};
use crate::error::RegistrationError;
use crate::store::PutResult;

// ---------------------------------------------------------------------------
// AttributeService
// ---------------------------------------------------------------------------

/// Creates and maintains the attribute maps attached to entries.
///
/// `create`/`update` run inside the put skeleton, before the entry is
/// constructed; `access` runs on read hits. Hard dependencies must be
/// updatable on every write, so their slots are materialized in every map
/// the service produces; soft dependencies are read-only and may stay
/// sparse. Registration is frozen once the store starts.
pub trait AttributeService<K, V> {
    /// Produces the attribute map for a brand-new entry.
    fn create(&mut self, key: &K, value: &V, attrs: &AttributeMap) -> AttributeMap;

    /// Produces the attribute map for an entry replacing `previous`.
    fn update(
        &mut self,
        key: &K,
        value: &V,
        attrs: &AttributeMap,
        previous: &AttributeMap,
    ) -> AttributeMap;

    /// Records a read hit on an existing entry's attributes.
    fn access(&self, attrs: &AttributeMap);

    /// Registers a hard dependency: the slot is reserved in every map.
    fn depend_on_hard(&mut self, attr: AnyAttribute) -> Result<(), RegistrationError>;

    /// Registers a soft dependency: read-only, possibly sparse.
    fn depend_on_soft(&mut self, attr: AnyAttribute) -> Result<(), RegistrationError>;

    /// Freezes registration; called when the store starts.
    fn freeze(&mut self);
}

// ---------------------------------------------------------------------------
// ExceptionHandler
// ---------------------------------------------------------------------------

/// The store's exception pipeline.
///
/// `fatal` and `warning` are emission-only. `load_failed` may recover from
/// a loader failure by returning a substitute value, which the store
/// inserts through the normal put skeleton; returning `None` propagates the
/// failure to the caller.
pub trait ExceptionHandler<K, V> {
    /// Reports an unrecoverable condition (contract violations, panicking
    /// predicates).
    fn fatal(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>);

    /// Reports a recoverable anomaly (no-progress evictors, listener
    /// panics).
    fn warning(&self, message: &str);

    /// Decides the outcome of a loader failure: a substitute value, or
    /// `None` to propagate.
    fn load_failed(
        &self,
        cause: &(dyn std::error::Error + 'static),
        key: &K,
        attrs: &AttributeMap,
    ) -> Option<V>;
}

// ---------------------------------------------------------------------------
// CacheLoader
// ---------------------------------------------------------------------------

/// Produces values for missing keys, synchronously.
///
/// A `Ok(Some(..))` result is inserted through the normal put skeleton,
/// policy admission and trims included. `Ok(None)` is a plain miss.
/// Failures are routed through [`ExceptionHandler::load_failed`].
pub trait CacheLoader<K, V> {
    /// Loads the value (and optional attributes) for `key`.
    fn load(
        &mut self,
        key: &K,
        attrs: &AttributeMap,
    ) -> Result<Option<(V, AttributeMap)>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<K, V, F> CacheLoader<K, V> for F
where
    F: FnMut(&K) -> Option<V>,
{
    fn load(
        &mut self,
        key: &K,
        _attrs: &AttributeMap,
    ) -> Result<Option<(V, AttributeMap)>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self(key).map(|value| (value, AttributeMap::new())))
    }
}

// ---------------------------------------------------------------------------
// StoreListener
// ---------------------------------------------------------------------------

/// Identifies a mutating operation and its arguments.
#[derive(Debug, Clone, Copy)]
pub enum OpToken<'a, K> {
    /// A put (or put-if-absent) of `key`.
    Put {
        key: &'a K,
        only_if_absent: bool,
    },
    /// A conditional or unconditional value replace of `key`.
    Replace { key: &'a K },
    /// A removal of `key`.
    Remove { key: &'a K },
    /// A full clear.
    Clear,
    /// An explicit trim request.
    Trim,
    /// A read-through load of `key`.
    Load { key: &'a K },
}

/// Fire-and-forget before/after channel around every mutation.
///
/// `before` receives the operation token; `after` receives the same token
/// plus the outcome (previous entry, new entry, evicted batch). Listener
/// panics are caught and reported as warnings; they never affect store
/// invariants. Side effects within one operation are ordered: `before`,
/// attribute-service calls, policy calls, map mutation, trim evictions,
/// `after`.
pub trait StoreListener<K, V> {
    /// Called before the mutation is applied.
    fn before(&self, op: &OpToken<'_, K>);

    /// Called after the mutation completed, with its outcome.
    fn after(&self, op: &OpToken<'_, K>, outcome: &PutResult<K, V>);
}
