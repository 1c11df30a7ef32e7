//! State snapshots
//!
//! A snapshot is an owned copy of a container's entries and capabilities,
//! taken immediately before a verified call and read by postconditions as the
//! "old" state. Comparison is by value; entry order is kept only so that
//! debugging output follows the store's own iteration order.

use std::fmt;

use indexmap::IndexMap;

use crate::item::{MapItem, MapKey};
use crate::view::{Capabilities, MapView};

/// Independent, read-only copy of a container
#[derive(Clone)]
pub struct Snapshot<K, V> {
    entries: IndexMap<K, V>,
    capabilities: Capabilities,
}

impl<K: MapKey, V: MapItem> Snapshot<K, V> {
    /// Copy every entry of `view`
    pub fn capture<M: MapView<K, V> + ?Sized>(view: &M) -> Self {
        let mut entries = IndexMap::with_capacity(view.len());
        view.any_entry(&mut |k, v| {
            entries.insert(k.clone(), v.clone());
            false
        });
        Self {
            entries,
            capabilities: view.capabilities(),
        }
    }

    /// Snapshot of a detached list of entries, e.g. the argument of `put_all`
    pub fn from_entries(entries: impl IntoIterator<Item = (K, V)>, capabilities: Capabilities) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            capabilities,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}

impl<K: MapKey, V: MapItem> MapView<K, V> for Snapshot<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn any_entry(&self, f: &mut dyn FnMut(&K, &V) -> bool) -> bool {
        self.entries.iter().any(|(k, v)| f(k, v))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

impl<K: MapKey, V: MapItem> PartialEq for Snapshot<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.capabilities == other.capabilities && self.entries == other.entries
    }
}

impl<K: MapKey, V: MapItem + Eq> Eq for Snapshot<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Snapshot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HashStore;
    use crate::view::BackingStore;

    #[test]
    fn test_snapshot_is_independent() {
        let mut store = HashStore::new();
        store.put("one".to_string(), 1);
        let snapshot = Snapshot::capture(&store);

        store.put("two".to_string(), 2);
        store.remove(&"one".to_string());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&"one".to_string()), Some(1));
        assert!(!snapshot.contains_key(&"two".to_string()));
    }

    #[test]
    fn test_snapshot_value_equality() {
        let a = Snapshot::from_entries([(1, "Jan"), (2, "Feb")], Capabilities::all());
        let b = Snapshot::from_entries([(2, "Feb"), (1, "Jan")], Capabilities::all());
        assert_eq!(a, b);

        let c = Snapshot::from_entries([(1, "Jan")], Capabilities::all());
        assert_ne!(a, c);
    }

    #[test]
    fn test_snapshot_queries_like_a_container() {
        let store = HashStore::from_entries([(1, "Jan"), (2, "Feb")], Capabilities::all());
        let snapshot = Snapshot::capture(&store);
        assert!(snapshot.contains_value(&"Feb"));
        assert_eq!(snapshot.hash_code(), store.hash_code());
        assert!(snapshot.equals(&store));
        assert_eq!(snapshot.capabilities(), Capabilities::all());
    }

    #[test]
    fn test_capabilities_take_part_in_equality() {
        let a = Snapshot::from_entries([(1, 1)], Capabilities::all());
        let b = Snapshot::from_entries([(1, 1)], Capabilities::read_only());
        assert_ne!(a, b);
    }
}
