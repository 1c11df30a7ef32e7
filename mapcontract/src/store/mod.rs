//! Backing store implementations
//!
//! - `HashStore`: single-owner store over `std::collections::HashMap`
//! - `SharedStore`: cloneable, lock-guarded store that never admits nulls

mod shared;

use std::collections::HashMap;
use std::hash::Hash;

use crate::view::{BackingStore, Capabilities, MapView};

pub use shared::SharedStore;

/// Backing store over a `HashMap`
#[derive(Debug, Clone)]
pub struct HashStore<K, V> {
    map: HashMap<K, V>,
    capabilities: Capabilities,
}

impl<K: Eq + Hash, V> HashStore<K, V> {
    /// Create an empty store supporting every operation and null items
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            map: HashMap::new(),
            capabilities,
        }
    }

    /// Create a store holding `entries`; later duplicates win
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>, capabilities: Capabilities) -> Self {
        Self {
            map: entries.into_iter().collect(),
            capabilities,
        }
    }
}

impl<K: Eq + Hash, V> Default for HashStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V: Clone> MapView<K, V> for HashStore<K, V> {
    fn len(&self) -> usize {
        self.map.len()
    }

    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn any_entry(&self, f: &mut dyn FnMut(&K, &V) -> bool) -> bool {
        self.map.iter().any(|(k, v)| f(k, v))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl<K: Eq + Hash, V: Clone> BackingStore<K, V> for HashStore<K, V> {
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    fn put_all(&mut self, entries: Vec<(K, V)>) {
        self.map.extend(entries);
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn update_each(&mut self, f: &mut dyn FnMut(&K, &mut V)) {
        for (k, v) in self.map.iter_mut() {
            f(k, v);
        }
    }
}
