//! polycache: an in-process cache framework.
//!
//! A keyed memory store with pluggable replacement policies (FIFO, LRU,
//! MRU, Clock, LFU, Random), capacity budgets by entry count and by
//! byte-volume, typed per-entry metadata ("attributes"), optional
//! read-through loading, and a before/after mutation listener channel.
//!
//! ## Quick start
//!
//! ```
//! use polycache::builder::MemoryStoreBuilder;
//! use polycache::policy::LruPolicy;
//!
//! let mut store = MemoryStoreBuilder::new()
//!     .max_size(3)
//!     .policy(LruPolicy::new())
//!     .build()
//!     .unwrap();
//!
//! store.put("a", 1).unwrap();
//! store.put("b", 2).unwrap();
//! store.put("c", 3).unwrap();
//! assert!(store.get(&"a").unwrap().is_some()); // refresh "a"
//!
//! let result = store.put("d", 4).unwrap();
//! assert_eq!(*result.evicted[0].key(), "b"); // the least recently used
//! ```
//!
//! ## Layout
//!
//! - [`attribute`]: typed descriptors and the per-entry attribute map
//! - [`entry`]: the immutable `{key, value, attributes}` triple
//! - [`ds`]: the intrusive entry list behind the list-based policies
//! - [`policy`]: the replacement-policy contract and the shipped policies
//! - [`service`]: collaborator interfaces (attributes, exceptions, loader,
//!   listener) and their default implementations
//! - [`store`]: the memory store itself, plus the feature-gated
//!   synchronized wrapper
//! - [`builder`]: explicit construction

pub mod attribute;
pub mod builder;
pub mod ds;
pub mod entry;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod service;
pub mod store;
