//! Explicit construction of a memory store and its collaborators.
//!
//! The store is wired by hand: every collaborator (policy, attribute
//! service, exception handler, listener, loader, cacheability predicate,
//! custom evictor) is handed to the builder as a value. No service
//! container, no runtime discovery.
//!
//! ## Example
//!
//! ```
//! use polycache::builder::MemoryStoreBuilder;
//! use polycache::policy::LruPolicy;
//!
//! let mut store = MemoryStoreBuilder::new()
//!     .max_size(10_000)
//!     .max_volume(64 * 1024 * 1024)
//!     .policy(LruPolicy::new())
//!     .build()
//!     .unwrap();
//!
//! store.put("config", "{}").unwrap();
//! assert_eq!(store.len(), 1);
//! ```

use std::hash::Hash;

use crate::entry::CacheEntry;
use crate::error::ConfigError;
use crate::policy::ReplacementPolicy;
use crate::service::{
    AttributeService, CacheLoader, DefaultAttributeService, DefaultExceptionHandler,
    ExceptionHandler, StoreListener,
};
use crate::store::memory::{CacheablePredicate, Evictor, StoreParts};
use crate::store::{MemoryStore, TrimView};

/// Builder for [`MemoryStore`].
///
/// Budgets default to unbounded; the attribute service defaults to
/// [`DefaultAttributeService`] and the exception handler to
/// [`DefaultExceptionHandler`]. A budget of zero fails `build`.
pub struct MemoryStoreBuilder<K, V> {
    max_size: Option<usize>,
    max_volume: Option<u64>,
    policy: Option<Box<dyn ReplacementPolicy<K, V> + Send>>,
    attributes: Option<Box<dyn AttributeService<K, V> + Send>>,
    exceptions: Option<Box<dyn ExceptionHandler<K, V> + Send>>,
    listener: Option<Box<dyn StoreListener<K, V> + Send>>,
    loader: Option<Box<dyn CacheLoader<K, V> + Send>>,
    is_cacheable: Option<CacheablePredicate<K, V>>,
    evictor: Option<Evictor<K, V>>,
    disabled: bool,
}

impl<K: 'static, V: 'static> MemoryStoreBuilder<K, V> {
    /// Creates a builder with unbounded budgets and no policy.
    pub fn new() -> Self {
        Self {
            max_size: None,
            max_volume: None,
            policy: None,
            attributes: None,
            exceptions: None,
            listener: None,
            loader: None,
            is_cacheable: None,
            evictor: None,
            disabled: false,
        }
    }

    /// Sets the entry-count budget. Must be positive.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the volume budget. Must be positive.
    pub fn max_volume(mut self, max_volume: u64) -> Self {
        self.max_volume = Some(max_volume);
        self
    }

    /// Installs a replacement policy.
    pub fn policy(mut self, policy: impl ReplacementPolicy<K, V> + Send + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Replaces the default attribute service.
    pub fn attribute_service(
        mut self,
        service: impl AttributeService<K, V> + Send + 'static,
    ) -> Self {
        self.attributes = Some(Box::new(service));
        self
    }

    /// Replaces the default exception handler.
    pub fn exception_handler(
        mut self,
        handler: impl ExceptionHandler<K, V> + Send + 'static,
    ) -> Self {
        self.exceptions = Some(Box::new(handler));
        self
    }

    /// Installs the before/after mutation listener.
    pub fn listener(mut self, listener: impl StoreListener<K, V> + Send + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Installs a read-through loader, enabling
    /// [`MemoryStore::get_or_load`].
    pub fn loader(mut self, loader: impl CacheLoader<K, V> + Send + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Installs an admission predicate; entries it refuses (or panics on)
    /// are not cached.
    pub fn is_cacheable(
        mut self,
        predicate: impl Fn(&CacheEntry<K, V>) -> bool + Send + 'static,
    ) -> Self {
        self.is_cacheable = Some(Box::new(predicate));
        self
    }

    /// Installs a custom evictor consulted by the trim loop.
    pub fn evictor(mut self, evictor: impl FnMut(&mut TrimView<K, V>) + Send + 'static) -> Self {
        self.evictor = Some(Box::new(evictor));
        self
    }

    /// Starts the store disabled: reads answered, writes ignored.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Builds the store.
    pub fn build(self) -> Result<MemoryStore<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone + 'static,
        V: 'static,
    {
        if self.max_size == Some(0) {
            return Err(ConfigError::new("max_size must be > 0"));
        }
        if self.max_volume == Some(0) {
            return Err(ConfigError::new("max_volume must be > 0"));
        }
        Ok(MemoryStore::from_parts(StoreParts {
            max_size: self.max_size.unwrap_or(usize::MAX),
            max_volume: self.max_volume.unwrap_or(u64::MAX),
            policy: self.policy,
            attributes: self
                .attributes
                .unwrap_or_else(|| Box::new(DefaultAttributeService::new())),
            exceptions: self
                .exceptions
                .unwrap_or_else(|| Box::new(DefaultExceptionHandler::new())),
            listener: self.listener,
            loader: self.loader,
            is_cacheable: self.is_cacheable,
            evictor: self.evictor,
            disabled: self.disabled,
        }))
    }
}

impl<K: 'static, V: 'static> Default for MemoryStoreBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
