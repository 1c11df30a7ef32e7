//! Entries of a mutable traversal
//!
//! An [`EntryMut`] writes through to the store with `put` and, when
//! verification is enforced, reads the store back to check the write. The
//! value an entry held before its first write is kept so a failed traversal
//! can be rolled back.

use std::fmt;
use std::mem;

use crate::contract::{EntryCheck, Operation, TypeWitness};
use crate::error::Result;
use crate::item::{MapItem, MapKey, entry_hash};
use crate::view::{BackingStore, Capabilities};

use super::verifier::Verifier;

/// One entry during [`VerifiedMap::for_each_entry_mut`](super::VerifiedMap::for_each_entry_mut)
///
/// Valid for a single traversal step. `set_value` writes through to the map.
pub struct EntryMut<'a, K, V> {
    key: &'a K,
    value: V,
    original: Option<V>,
    store: &'a mut dyn BackingStore<K, V>,
    capabilities: Capabilities,
    verifier: &'a Verifier<K, V>,
}

impl<'a, K: MapKey, V: MapItem> EntryMut<'a, K, V> {
    pub(crate) fn new(
        key: &'a K,
        value: V,
        store: &'a mut dyn BackingStore<K, V>,
        verifier: &'a Verifier<K, V>,
    ) -> Self {
        let capabilities = store.capabilities();
        Self {
            key,
            value,
            original: None,
            store,
            capabilities,
            verifier,
        }
    }

    pub fn key(&self) -> &K {
        self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Key hash XOR value hash
    pub fn hash_code(&self) -> u64 {
        entry_hash(self.key, &self.value)
    }

    /// Replace the value of this entry, returning the previous one
    pub fn set_value(&mut self, value: V) -> Result<V> {
        let store = &*self.store;
        self.verifier
            .require(Operation::EntrySetValue, self.capabilities, &[], &[&value], || {
                TypeWitness::of(store)
            })?;

        let returned = self.store.put(self.key.clone(), value.clone());
        let old = mem::replace(&mut self.value, value);
        if self.original.is_none() {
            self.original = Some(old.clone());
        }

        if self.verifier.is_enforced() {
            let stored = self.store.get(self.key);
            self.verifier.check_set_value(&EntryCheck {
                key: self.key,
                value: &self.value,
                hash: self.hash_code(),
                stored: stored.as_ref(),
                argument: Some(&self.value),
                old_value: Some(&old),
                returned: returned.as_ref(),
            })?;
        }
        Ok(old)
    }

    /// Entry invariants against the store's own answer for this key
    pub(crate) fn check(&self) -> Result<()> {
        if !self.verifier.is_enforced() {
            return Ok(());
        }
        let stored = self.store.get(self.key);
        self.verifier
            .check_entry(self.key, &self.value, self.hash_code(), stored.as_ref())
    }

    /// `(value before the first write, current value)` if the entry was written
    pub(crate) fn into_write(self) -> Option<(V, V)> {
        let value = self.value;
        self.original.map(|original| (original, value))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for EntryMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryMut")
            .field("key", self.key)
            .field("value", &self.value)
            .field("written", &self.original.is_some())
            .finish()
    }
}
