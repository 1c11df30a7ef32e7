//! Lock-guarded store shared between handles
//!
//! Every primitive takes the lock for its own duration only. A verified call
//! over a `SharedStore` is therefore not atomic: another handle may mutate the
//! map between the snapshot, the delegated call and the postcondition checks,
//! and such interleavings can surface as contract violations. Give each
//! verified map exclusive use of the store while calls are in flight.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::view::{BackingStore, Capabilities, MapView};

/// Cloneable handle to a map guarded by a read-write lock
///
/// Null items are never supported, whatever capabilities are requested.
#[derive(Debug)]
pub struct SharedStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
    capabilities: Capabilities,
}

impl<K, V> Clone for SharedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capabilities: self.capabilities,
        }
    }
}

impl<K: Eq + Hash, V> SharedStore<K, V> {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            capabilities: capabilities.without_null_items(),
        }
    }

    /// Number of live handles to this store
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<K: Eq + Hash, V> Default for SharedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V: Clone> MapView<K, V> for SharedStore<K, V> {
    fn len(&self) -> usize {
        self.inner.read().len()
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    fn any_entry(&self, f: &mut dyn FnMut(&K, &V) -> bool) -> bool {
        self.inner.read_recursive().iter().any(|(k, v)| f(k, v))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl<K: Eq + Hash, V: Clone> BackingStore<K, V> for SharedStore<K, V> {
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    fn put_all(&mut self, entries: Vec<(K, V)>) {
        self.inner.write().extend(entries);
    }

    fn clear(&mut self) {
        self.inner.write().clear();
    }

    fn update_each(&mut self, f: &mut dyn FnMut(&K, &mut V)) {
        for (k, v) in self.inner.write().iter_mut() {
            f(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_supports_nulls() {
        let store = SharedStore::<u8, u8>::with_capabilities(Capabilities::all());
        assert!(!store.capabilities().null_items);
        assert!(store.capabilities().put);
    }

    #[test]
    fn test_handles_share_state() {
        let mut a = SharedStore::new();
        let b = a.clone();
        a.put("k", 1);
        assert_eq!(b.get(&"k"), Some(1));
        assert_eq!(b.handle_count(), 2);
    }

    #[test]
    fn test_shared_across_threads() {
        let store = SharedStore::new();
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let mut handle = store.clone();
                std::thread::spawn(move || {
                    handle.put(i, i * 10);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(&3), Some(30));
    }
}
