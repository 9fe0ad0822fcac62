// ==============================================
// END-TO-END STORE SCENARIOS (integration)
// ==============================================
//
// Literal walk-throughs of the store's observable behavior: capacity
// enforcement under each budget, replace semantics, disabled stores,
// custom evictors, read-through loading, and the listener channel.

use std::sync::{Arc, Mutex};

use polycache::attribute::{well_known, AttributeMap};
use polycache::builder::MemoryStoreBuilder;
use polycache::entry::CacheEntry;
use polycache::error::StoreError;
use polycache::policy::{FifoPolicy, LruPolicy};
use polycache::service::{CacheLoader, ExceptionHandler, OpToken, StoreListener};
use polycache::store::{MemoryStore, PutResult};

fn keys(store: &MemoryStore<u64, &'static str>) -> Vec<u64> {
    let mut keys: Vec<u64> = store.iter().map(|e| *e.key()).collect();
    keys.sort_unstable();
    keys
}

// ==============================================
// Capacity by count (FIFO)
// ==============================================

#[test]
fn fifo_count_budget_evicts_the_longest_resident() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(3)
        .policy(FifoPolicy::new())
        .build()
        .unwrap();

    store.put(1, "a").unwrap();
    store.put(2, "b").unwrap();
    store.put(3, "c").unwrap();
    let result = store.put(4, "d").unwrap();

    assert_eq!(result.evicted.len(), 1);
    assert_eq!(*result.evicted[0].key(), 1);
    assert_eq!(*result.evicted[0].value(), "a");
    assert_eq!(store.len(), 3);
    assert_eq!(keys(&store), vec![2, 3, 4]);
}

// ==============================================
// LRU touch
// ==============================================

#[test]
fn lru_touch_protects_the_refreshed_key() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(3)
        .policy(LruPolicy::new())
        .build()
        .unwrap();

    store.put(1, "a").unwrap();
    store.put(2, "b").unwrap();
    store.put(3, "c").unwrap();
    assert!(store.get(&1).unwrap().is_some());
    let result = store.put(4, "d").unwrap();

    assert_eq!(result.evicted.len(), 1);
    assert_eq!(*result.evicted[0].key(), 2);
    assert_eq!(keys(&store), vec![1, 3, 4]);
}

#[test]
fn lru_keeps_exactly_the_last_touched_keys() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(4)
        .policy(LruPolicy::new())
        .build()
        .unwrap();

    for k in 0..10u64 {
        store.put(k, "v").unwrap();
    }
    // Touch a survivor set: 7 via read, the rest via insert order.
    assert!(store.get(&7).unwrap().is_some());
    store.put(10, "v").unwrap();

    // The remaining keys are exactly the last four touched (read or
    // inserted): 7, 8, 9, 10.
    assert_eq!(keys(&store), vec![7, 8, 9, 10]);
}

// ==============================================
// Volume cap
// ==============================================

#[test]
fn volume_budget_evicts_to_fit() {
    let mut store = MemoryStoreBuilder::new().max_volume(10).build().unwrap();

    let mut attrs = AttributeMap::new();
    attrs.try_put(well_known::size(), 4).unwrap();

    store.put_with_attributes(1, "a", &attrs).unwrap();
    store.put_with_attributes(2, "b", &attrs).unwrap();
    assert_eq!(store.volume(), 8);

    let result = store.put_with_attributes(3, "c", &attrs).unwrap();
    assert_eq!(result.evicted.len(), 1);
    assert_eq!(store.len(), 2);
    assert_eq!(store.volume(), 8);
}

// ==============================================
// Disabled store
// ==============================================

#[test]
fn disabled_store_is_a_read_only_void() {
    let mut store: MemoryStore<u64, &str> =
        MemoryStoreBuilder::new().disabled(true).build().unwrap();

    let result = store.put(1, "a").unwrap();
    assert!(result.previous.is_none());
    assert!(result.entry.is_none());
    assert!(result.evicted.is_empty());
    assert_eq!(store.get(&1).unwrap(), None);
    assert_eq!(store.len(), 0);
    assert_eq!(store.volume(), 0);
}

// ==============================================
// Replace contract
// ==============================================

#[test]
fn replace_if_equals_honors_the_witness() {
    let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new().build().unwrap();
    store.put(1, "v").unwrap();

    let refused = store.replace_if_equals(&1, &"wrong", "new").unwrap();
    assert!(!refused.inserted());
    assert_eq!(store.peek(&1).map(|e| *e.value()), Some("v"));

    let swapped = store.replace_if_equals(&1, &"v", "new").unwrap();
    assert!(swapped.inserted());
    assert_eq!(store.peek(&1).map(|e| *e.value()), Some("new"));
}

// ==============================================
// Custom evictor
// ==============================================

#[test]
fn custom_evictor_trims_to_its_target() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(5)
        .policy(LruPolicy::new())
        .evictor(|view| view.trim_to_size(2))
        .build()
        .unwrap();

    for k in 1..=5u64 {
        store.put(k, "v").unwrap();
    }
    let result = store.put(6, "v").unwrap();

    // Overfilled to 6; the evictor asked for 2; exactly 4 evicted.
    assert_eq!(result.evicted.len(), 4);
    assert_eq!(store.len(), 2);
    assert_eq!(keys(&store), vec![5, 6]);
}

#[test]
fn evictor_comparator_picks_the_victims() {
    let mut store = MemoryStoreBuilder::<u64, &str>::new()
        .max_size(4)
        .policy(LruPolicy::new())
        // Evict the largest keys first.
        .evictor(|view| view.trim_to_size_by(3, |a, b| b.key().cmp(a.key())))
        .build()
        .unwrap();

    for k in 1..=4u64 {
        store.put(k, "v").unwrap();
    }
    store.put(5, "v").unwrap();
    assert_eq!(keys(&store), vec![1, 2, 3]);
}

// ==============================================
// Lifecycle
// ==============================================

#[test]
fn shutdown_store_answers_reads_only() {
    let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new().build().unwrap();
    store.put(1, "a").unwrap();
    store.shutdown();

    assert!(matches!(store.put(2, "b"), Err(StoreError::Shutdown)));
    assert!(matches!(store.clear(), Err(StoreError::Shutdown)));
    assert_eq!(store.peek(&1).map(|e| *e.value()), Some("a"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.volume(), 1);
    assert!(store.contains(&1));
}

// ==============================================
// Read-through loading
// ==============================================

#[test]
fn loader_fabricates_missing_entries() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(8)
        .policy(LruPolicy::new())
        .loader(|key: &u64| {
            if *key < 100 {
                Some(format!("loaded-{key}"))
            } else {
                None
            }
        })
        .build()
        .unwrap();

    let loaded = store.get_or_load(&7).unwrap().unwrap();
    assert_eq!(loaded.value(), "loaded-7");
    // The loaded entry went through the normal put skeleton.
    assert_eq!(store.len(), 1);
    assert_eq!(store.peek(&7).map(|e| e.value().clone()), Some("loaded-7".to_string()));

    // A loader miss is a plain miss.
    assert!(store.get_or_load(&500).unwrap().is_none());
    assert_eq!(store.len(), 1);
}

struct FailingLoader;

impl CacheLoader<u64, &'static str> for FailingLoader {
    fn load(
        &mut self,
        _key: &u64,
        _attrs: &AttributeMap,
    ) -> Result<Option<(&'static str, AttributeMap)>, Box<dyn std::error::Error + Send + Sync>>
    {
        Err("backend unavailable".into())
    }
}

#[test]
fn loader_failures_propagate_by_default() {
    let mut store = MemoryStoreBuilder::new()
        .loader(FailingLoader)
        .build()
        .unwrap();

    let err = store.get_or_load(&1).unwrap_err();
    assert!(matches!(err, StoreError::LoadFailed(_)));
    assert!(err.to_string().contains("backend unavailable"));
    assert_eq!(store.len(), 0);
}

struct SubstitutingHandler;

impl ExceptionHandler<u64, &'static str> for SubstitutingHandler {
    fn fatal(&self, _message: &str, _cause: Option<&(dyn std::error::Error + 'static)>) {}

    fn warning(&self, _message: &str) {}

    fn load_failed(
        &self,
        _cause: &(dyn std::error::Error + 'static),
        _key: &u64,
        _attrs: &AttributeMap,
    ) -> Option<&'static str> {
        Some("substitute")
    }
}

#[test]
fn exception_handler_can_substitute_a_loaded_value() {
    let mut store = MemoryStoreBuilder::new()
        .loader(FailingLoader)
        .exception_handler(SubstitutingHandler)
        .build()
        .unwrap();

    let entry = store.get_or_load(&1).unwrap().unwrap();
    assert_eq!(*entry.value(), "substitute");
    // The substitute was inserted normally.
    assert_eq!(store.peek(&1).map(|e| *e.value()), Some("substitute"));
}

// ==============================================
// Listener channel
// ==============================================

#[derive(Clone, Default)]
struct RecordingListener {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingListener {
    fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl StoreListener<u64, &'static str> for RecordingListener {
    fn before(&self, op: &OpToken<'_, u64>) {
        self.record(format!("before {op:?}"));
    }

    fn after(&self, op: &OpToken<'_, u64>, outcome: &PutResult<u64, &'static str>) {
        self.record(format!(
            "after {op:?} evicted={}",
            outcome.evicted.len()
        ));
    }
}

#[test]
fn every_mutation_is_bracketed_by_events() {
    let listener = RecordingListener::default();
    let mut store = MemoryStoreBuilder::new()
        .max_size(2)
        .policy(FifoPolicy::new())
        .listener(listener.clone())
        .build()
        .unwrap();

    store.put(1, "a").unwrap();
    let events = listener.drain();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("before Put"));
    assert!(events[1].starts_with("after Put"));

    assert!(store.remove(&1).unwrap().is_some());
    let events = listener.drain();
    assert!(events[0].starts_with("before Remove"));
    assert!(events[1].starts_with("after Remove"));

    store.clear().unwrap();
    let events = listener.drain();
    assert!(events[0].starts_with("before Clear"));
    assert!(events[1].starts_with("after Clear"));
}

#[test]
fn put_all_fires_per_entry_events() {
    let listener = RecordingListener::default();
    let mut store = MemoryStoreBuilder::new()
        .max_size(2)
        .policy(FifoPolicy::new())
        .listener(listener.clone())
        .build()
        .unwrap();

    store.put_all(vec![(1, "a"), (2, "b"), (3, "c")]).unwrap();
    let events = listener.drain();
    // Three puts, each bracketed.
    assert_eq!(events.len(), 6);
    // The third put carried the eviction in its after event.
    assert!(events[5].contains("evicted=1"));
}

struct PanickyListener;

impl StoreListener<u64, &'static str> for PanickyListener {
    fn before(&self, _op: &OpToken<'_, u64>) {
        panic!("listener bug");
    }

    fn after(&self, _op: &OpToken<'_, u64>, _outcome: &PutResult<u64, &'static str>) {
        panic!("listener bug");
    }
}

#[test]
fn listener_panics_do_not_corrupt_the_store() {
    let mut store = MemoryStoreBuilder::new()
        .max_size(2)
        .policy(FifoPolicy::new())
        .listener(PanickyListener)
        .build()
        .unwrap();

    store.put(1, "a").unwrap();
    store.put(2, "b").unwrap();
    store.put(3, "c").unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.volume(), 2);
    assert!(store.remove(&3).unwrap().is_some());
    assert_eq!(store.len(), 1);
}

// ==============================================
// Attribute flow through the store
// ==============================================

#[test]
fn entry_attributes_are_observable_on_results() {
    let mut store: MemoryStore<u64, &str> = MemoryStoreBuilder::new().build().unwrap();
    let mut attrs = AttributeMap::new();
    attrs.try_put(well_known::size(), 16).unwrap();
    attrs.try_put(well_known::cost(), 2.5).unwrap();

    let result = store.put_with_attributes(1, "payload", &attrs).unwrap();
    let entry: &Arc<CacheEntry<u64, &str>> = result.entry.as_ref().unwrap();
    assert_eq!(entry.get(well_known::size()), 16);
    assert_eq!(entry.get(well_known::cost()), 2.5);
    assert_eq!(store.volume(), 16);
}

#[test]
fn trim_to_size_zero_empties_and_reports_everything() {
    let mut store = MemoryStoreBuilder::new()
        .policy(LruPolicy::new())
        .build()
        .unwrap();
    for k in 0..6u64 {
        store.put(k, "v").unwrap();
    }
    let evicted = store.trim_to_size(0).unwrap();
    assert_eq!(evicted.len(), 6);
    assert!(store.is_empty());
    assert_eq!(store.volume(), 0);
    for k in 0..6u64 {
        assert_eq!(store.peek(&k), None);
    }
}
