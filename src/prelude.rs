//! Curated re-exports for the common path.

pub use crate::attribute::{well_known, AttrValue, Attribute, AttributeMap, TypeTag};
pub use crate::builder::MemoryStoreBuilder;
pub use crate::entry::CacheEntry;
pub use crate::error::{AttributeError, ConfigError, RegistrationError, StoreError};
pub use crate::policy::{
    ClockPolicy, FifoPolicy, LfuPolicy, LruPolicy, MruPolicy, PolicyRegistration, RandomPolicy,
    ReplacementPolicy, Retain, UnlimitedPolicy,
};
pub use crate::service::{
    AttributeService, CacheLoader, DefaultAttributeService, DefaultExceptionHandler,
    ExceptionHandler, OpToken, StoreListener,
};
pub use crate::store::{
    EntryComparator, MemoryStore, PutResult, RunState, StoreMetrics, TrimView,
};

#[cfg(feature = "concurrency")]
pub use crate::store::SyncMemoryStore;
