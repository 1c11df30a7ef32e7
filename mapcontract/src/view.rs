//! Read and write surfaces of a container
//!
//! `MapView` is the read-only query surface shared by live backing stores and
//! snapshots, so a postcondition can ask the same questions of the state
//! before and after a call. `BackingStore` adds the raw, unverified mutation
//! primitives a verified map delegates to.

use serde::{Deserialize, Serialize};

use crate::item::{MapItem, entry_hash};

/// Capability flags of a container, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Null keys and values may be stored
    pub null_items: bool,
    /// `put` and the operations built on it are available
    pub put: bool,
    /// `remove` and the operations built on it are available
    pub remove: bool,
    /// `clear` is available
    pub clear: bool,
}

impl Capabilities {
    /// Every operation supported, nulls allowed
    pub const fn all() -> Self {
        Self {
            null_items: true,
            put: true,
            remove: true,
            clear: true,
        }
    }

    /// No mutation supported
    pub const fn read_only() -> Self {
        Self {
            null_items: true,
            put: false,
            remove: false,
            clear: false,
        }
    }

    pub const fn without_null_items(self) -> Self {
        self.with_null_items(false)
    }

    pub const fn with_null_items(mut self, enabled: bool) -> Self {
        self.null_items = enabled;
        self
    }

    pub const fn with_put(mut self, enabled: bool) -> Self {
        self.put = enabled;
        self
    }

    pub const fn with_remove(mut self, enabled: bool) -> Self {
        self.remove = enabled;
        self
    }

    pub const fn with_clear(mut self, enabled: bool) -> Self {
        self.clear = enabled;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Read-only query surface of a container
pub trait MapView<K, V> {
    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value stored for `key`, `None` if there is no entry
    fn get(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Visit entries until `f` returns true; reports whether it did
    fn any_entry(&self, f: &mut dyn FnMut(&K, &V) -> bool) -> bool;

    fn capabilities(&self) -> Capabilities;

    fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.any_entry(&mut |_, v| v == value)
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&K, &V)) {
        self.any_entry(&mut |k, v| {
            f(k, v);
            false
        });
    }

    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        self.for_each_entry(&mut |k, _| keys.push(k.clone()));
        keys
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut values = Vec::with_capacity(self.len());
        self.for_each_entry(&mut |_, v| values.push(v.clone()));
        values
    }

    fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut entries = Vec::with_capacity(self.len());
        self.for_each_entry(&mut |k, v| entries.push((k.clone(), v.clone())));
        entries
    }

    /// Sum of per-entry hashes (key hash XOR value hash), wrapping
    fn hash_code(&self) -> u64
    where
        K: MapItem,
        V: MapItem,
    {
        let mut sum = 0u64;
        self.for_each_entry(&mut |k, v| sum = sum.wrapping_add(entry_hash(k, v)));
        sum
    }

    /// Same size and identical key to value associations
    fn equals(&self, other: &dyn MapView<K, V>) -> bool
    where
        V: PartialEq,
    {
        self.len() == other.len() && !self.any_entry(&mut |k, v| other.get(k).as_ref() != Some(v))
    }
}

/// Raw storage primitives of a container
///
/// Implementations perform no checking of their own: the verified map
/// enforces null and capability policy before delegating.
pub trait BackingStore<K, V>: MapView<K, V> {
    /// Store `value` under `key`, returning the previous value
    fn put(&mut self, key: K, value: V) -> Option<V>;

    /// Remove the entry for `key`, returning its value
    fn remove(&mut self, key: &K) -> Option<V>;

    fn put_all(&mut self, entries: Vec<(K, V)>) {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    fn clear(&mut self);

    /// Visit every entry with write access to its value
    fn update_each(&mut self, f: &mut dyn FnMut(&K, &mut V));
}
