//! The shipped attribute service.
//!
//! Maintains the well-known attributes on every entry map it produces:
//! `size` is always reserved, and hit/timestamp upkeep is opt-in. Policy
//! hard dependencies registered before start are materialized in every map,
//! which is what allows policies to update their private slots in place on
//! shared entries.
//!
//! Timestamps come from a logical clock (a monotonic counter bumped on
//! every stamp) rather than wall time. Ordering is what the store and
//! policies care about, and a counter keeps tests deterministic.

use std::sync::atomic::{AtomicI64, Ordering};

use rustc_hash::FxHashSet;

use crate::attribute::{well_known, AnyAttribute, AttributeMap};
use crate::error::RegistrationError;
use crate::service::AttributeService;

/// Weighs an entry for its `size` attribute.
type Weigher<K, V> = Box<dyn Fn(&K, &V) -> i64 + Send>;

/// Default [`AttributeService`] implementation.
///
/// # Example
///
/// ```
/// use polycache::attribute::well_known;
/// use polycache::builder::MemoryStoreBuilder;
/// use polycache::service::DefaultAttributeService;
///
/// // Weigh string values by their byte length.
/// let service = DefaultAttributeService::new()
///     .with_weigher(|_key: &u64, value: &String| value.len() as i64);
///
/// let mut store = MemoryStoreBuilder::new()
///     .attribute_service(service)
///     .build()
///     .unwrap();
///
/// store.put(1, "hello".to_string()).unwrap();
/// let entry = store.peek(&1).unwrap();
/// assert_eq!(entry.get(well_known::size()), 5);
/// assert_eq!(store.volume(), 5);
/// ```
pub struct DefaultAttributeService<K, V> {
    /// Attributes reserved in every produced map: `size`, the optional
    /// tracked well-knowns, and policy hard dependencies.
    reserved: Vec<AnyAttribute>,
    /// Ids registered through `depend_on_*`, for duplicate detection.
    registered: FxHashSet<u64>,
    frozen: bool,
    clock: AtomicI64,
    track_hits: bool,
    track_times: bool,
    weigher: Option<Weigher<K, V>>,
}

impl<K, V> DefaultAttributeService<K, V> {
    /// Creates a service that maintains only the `size` attribute.
    pub fn new() -> Self {
        Self {
            reserved: vec![well_known::size().erased()],
            registered: FxHashSet::default(),
            frozen: false,
            clock: AtomicI64::new(1),
            track_hits: false,
            track_times: false,
            weigher: None,
        }
    }

    /// Also maintain the `hits` attribute: reset on insert, carried across
    /// value updates, bumped on every read hit.
    pub fn track_hits(mut self) -> Self {
        self.reserved.push(well_known::hits().erased());
        self.track_hits = true;
        self
    }

    /// Also maintain the `time.*` attributes from the logical clock.
    pub fn track_times(mut self) -> Self {
        self.reserved.push(well_known::time_created().erased());
        self.reserved.push(well_known::time_accessed().erased());
        self.reserved.push(well_known::time_modified().erased());
        self.track_times = true;
        self
    }

    /// Derives the `size` attribute from the key/value when the caller did
    /// not supply one. Negative weights are clamped to zero.
    pub fn with_weigher(mut self, weigher: impl Fn(&K, &V) -> i64 + Send + 'static) -> Self {
        self.weigher = Some(Box::new(weigher));
        self
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn base_map(&self, key: &K, value: &V, user: &AttributeMap) -> AttributeMap {
        let mut map = user.clone();
        if let Some(weigher) = &self.weigher {
            if !map.contains(well_known::size()) {
                // The validator only rejects negatives, which are clamped.
                let _ = map.try_put(well_known::size(), weigher(key, value).max(0));
            }
        }
        for attr in &self.reserved {
            attr.materialize(&mut map);
        }
        map
    }
}

impl<K, V> Default for DefaultAttributeService<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> AttributeService<K, V> for DefaultAttributeService<K, V> {
    fn create(&mut self, key: &K, value: &V, attrs: &AttributeMap) -> AttributeMap {
        let map = self.base_map(key, value, attrs);
        if self.track_times {
            let now = self.tick();
            map.set(well_known::time_created(), now);
            map.set(well_known::time_accessed(), now);
            map.set(well_known::time_modified(), now);
        }
        map
    }

    fn update(
        &mut self,
        key: &K,
        value: &V,
        attrs: &AttributeMap,
        previous: &AttributeMap,
    ) -> AttributeMap {
        let map = self.base_map(key, value, attrs);
        if self.track_hits && !attrs.contains(well_known::hits()) {
            map.set(well_known::hits(), previous.get(well_known::hits()));
        }
        if self.track_times {
            map.set(
                well_known::time_created(),
                previous.get(well_known::time_created()),
            );
            map.set(
                well_known::time_accessed(),
                previous.get(well_known::time_accessed()),
            );
            map.set(well_known::time_modified(), self.tick());
        }
        map
    }

    fn access(&self, attrs: &AttributeMap) {
        if self.track_hits {
            attrs.add_long(well_known::hits(), 1);
        }
        if self.track_times {
            attrs.set(well_known::time_accessed(), self.tick());
        }
    }

    fn depend_on_hard(&mut self, attr: AnyAttribute) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::Frozen(attr.name().to_string()));
        }
        if !self.registered.insert(attr.id()) {
            return Err(RegistrationError::Duplicate(attr.name().to_string()));
        }
        self.reserved.push(attr);
        Ok(())
    }

    fn depend_on_soft(&mut self, attr: AnyAttribute) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::Frozen(attr.name().to_string()));
        }
        if !self.registered.insert(attr.id()) {
            return Err(RegistrationError::Duplicate(attr.name().to_string()));
        }
        // Soft slots stay sparse; only the id is recorded.
        Ok(())
    }

    fn freeze(&mut self) {
        self.frozen = true;
    }
}
