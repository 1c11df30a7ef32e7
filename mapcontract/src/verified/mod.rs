//! Verified map
//!
//! `VerifiedMap` wraps a backing store and runs every public operation
//! through the contract registry:
//!
//! 1. preconditions (caller errors, nothing mutated)
//! 2. snapshot of the old state and entry invariants
//! 3. the delegated store call
//! 4. invariants and postconditions against old state, new state,
//!    arguments and outcome
//!
//! Steps 2 and 4 are skipped when verification is disabled.

mod delegate;
mod entry;
mod verifier;

use std::convert::Infallible;
use std::fmt;

use indexmap::IndexMap;

use crate::config::{VerificationStats, VerifyConfig};
use crate::contract::{Args, ContractRegistry, Operation, Outcome};
use crate::error::{CallbackError, Result};
use crate::item::{MapItem, MapKey};
use crate::snapshot::Snapshot;
use crate::store::HashStore;
use crate::view::{BackingStore, Capabilities, MapView};

pub use entry::EntryMut;
pub use verifier::Verifier;

use verifier::Recorder;

/// A map whose operations are checked against the map contract
pub struct VerifiedMap<K, V, S = HashStore<K, V>> {
    store: S,
    verifier: Verifier<K, V>,
}

impl<K: MapKey, V: MapItem> VerifiedMap<K, V> {
    /// Empty `HashStore`-backed map with every capability
    pub fn new() -> Self {
        Self::from_store(HashStore::new())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self::from_store(HashStore::with_capabilities(capabilities))
    }
}

impl<K: MapKey, V: MapItem> Default for VerifiedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey, V: MapItem, S: BackingStore<K, V>> VerifiedMap<K, V, S> {
    /// Wrap `store` with the standard contract and default configuration
    pub fn from_store(store: S) -> Self {
        Self::with_config(store, VerifyConfig::new())
    }

    pub fn with_config(store: S, config: VerifyConfig) -> Self {
        Self::with_registry(store, ContractRegistry::standard(), config)
    }

    /// Wrap `store` with a custom registry, e.g. one with extra invariants
    pub fn with_registry(store: S, registry: ContractRegistry<K, V>, config: VerifyConfig) -> Self {
        Self {
            store,
            verifier: Verifier::new(registry, config),
        }
    }

    pub fn config(&self) -> &VerifyConfig {
        self.verifier.config()
    }

    pub fn registry(&self) -> &ContractRegistry<K, V> {
        self.verifier.registry()
    }

    pub fn stats(&self) -> VerificationStats {
        self.verifier.stats()
    }

    /// Unverified read access to the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn capabilities(&self) -> Capabilities {
        self.store.capabilities()
    }

    /// Independent copy of the current contents
    pub fn snapshot(&self) -> Snapshot<K, V> {
        Snapshot::capture(&self.store)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn len(&self) -> Result<usize> {
        let pending = self.verifier.enter(&self.store, Operation::Size, &[], &[], Args::new)?;
        let result = Ok(self.store.len());
        self.verifier.exit(&self.store, pending, result, |n| Outcome::Len(*n))
    }

    pub fn is_empty(&self) -> Result<bool> {
        let pending = self.verifier.enter(&self.store, Operation::IsEmpty, &[], &[], Args::new)?;
        let result = Ok(self.store.is_empty());
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        let pending = self.verifier.enter(&self.store, Operation::ContainsKey, &[key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = Ok(self.store.contains_key(key));
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    pub fn contains_value(&self, value: &V) -> Result<bool> {
        let pending = self.verifier.enter(&self.store, Operation::ContainsValue, &[], &[value], || {
            Args::new().with_value(value.clone())
        })?;
        let result = Ok(self.store.contains_value(value));
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    /// Stored value for `key`, `None` if there is no entry
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let pending = self.verifier.enter(&self.store, Operation::Get, &[key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = Ok(self.store.get(key));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Stored value for `key`, `default` if there is no entry
    pub fn get_or_default(&self, key: &K, default: V) -> Result<V> {
        let pending = self.verifier.enter(&self.store, Operation::GetOrDefault, &[key], &[], || {
            Args::new().with_key(key.clone()).with_default(default.clone())
        })?;
        let result = Ok(self.store.get(key).unwrap_or(default));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(Some(v.clone())))
    }

    pub fn keys(&self) -> Result<Vec<K>> {
        let pending = self.verifier.enter(&self.store, Operation::Keys, &[], &[], Args::new)?;
        let result = Ok(self.store.keys());
        self.verifier.exit(&self.store, pending, result, |keys| Outcome::Keys(keys.clone()))
    }

    pub fn values(&self) -> Result<Vec<V>> {
        let pending = self.verifier.enter(&self.store, Operation::Values, &[], &[], Args::new)?;
        let result = Ok(self.store.values());
        self.verifier.exit(&self.store, pending, result, |values| Outcome::Values(values.clone()))
    }

    pub fn entries(&self) -> Result<Vec<(K, V)>> {
        let pending = self.verifier.enter(&self.store, Operation::Entries, &[], &[], Args::new)?;
        let result = Ok(self.store.entries());
        self.verifier.exit(&self.store, pending, result, |entries| Outcome::Entries(entries.clone()))
    }

    /// Same size and identical associations
    pub fn equals(&self, other: &dyn MapView<K, V>) -> Result<bool> {
        let pending = self.verifier.enter(&self.store, Operation::Equals, &[], &[], || {
            Args::new().with_other(Snapshot::capture(other))
        })?;
        let result = Ok(self.store.equals(other));
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    /// Wrapping sum of key hash XOR value hash over all entries
    pub fn hash_code(&self) -> Result<u64> {
        let pending = self.verifier.enter(&self.store, Operation::HashCode, &[], &[], Args::new)?;
        let result = Ok(self.store.hash_code());
        self.verifier.exit(&self.store, pending, result, |h| Outcome::Hash(*h))
    }

    /// Call `action` once per entry
    pub fn for_each(&self, mut action: impl FnMut(&K, &V)) -> Result<()> {
        let mut pending = self.verifier.enter(&self.store, Operation::ForEach, &[], &[], Args::new)?;
        let mut recorder = Recorder::of(&mut pending);
        self.store.for_each_entry(&mut |k, v| {
            recorder.pair(k, v);
            action(k, v);
        });
        self.verifier.exit(&self.store, pending, Ok(()), |_| Outcome::Unit)
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Store `value` under `key`, returning the previous value
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        let pending = self.verifier.enter(&self.store, Operation::Put, &[&key], &[&value], || {
            Args::new().with_key(key.clone()).with_value(value.clone())
        })?;
        let result = Ok(self.store.put(key, value));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Remove the entry for `key`, returning its value
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        let pending = self.verifier.enter(&self.store, Operation::Remove, &[key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = Ok(self.store.remove(key));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Store every entry of `entries`; later duplicates win
    pub fn put_all(&mut self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        let entries: Vec<(K, V)> = entries.into_iter().collect();
        let capabilities = self.store.capabilities();
        let pending = {
            let keys: Vec<&K> = entries.iter().map(|(k, _)| k).collect();
            let values: Vec<&V> = entries.iter().map(|(_, v)| v).collect();
            self.verifier.enter(&self.store, Operation::PutAll, &keys, &values, || {
                Args::new().with_other(Snapshot::from_entries(entries.iter().cloned(), capabilities))
            })?
        };
        self.store.put_all(entries);
        self.verifier.exit(&self.store, pending, Ok(()), |_| Outcome::Unit)
    }

    /// Remove every entry
    pub fn clear(&mut self) -> Result<()> {
        let pending = self.verifier.enter(&self.store, Operation::Clear, &[], &[], Args::new)?;
        self.store.clear();
        self.verifier.exit(&self.store, pending, Ok(()), |_| Outcome::Unit)
    }

    /// Replace every value with `function(key, value)`
    pub fn replace_all(&mut self, mut function: impl FnMut(&K, &V) -> V) -> Result<()> {
        self.try_replace_all(|k, v| Ok::<_, Infallible>(function(k, v)))
    }

    /// [`replace_all`](Self::replace_all) with a fallible function; on error
    /// nothing is replaced
    pub fn try_replace_all<F, E>(&mut self, function: F) -> Result<()>
    where
        F: FnMut(&K, &V) -> std::result::Result<V, E>,
        E: Into<CallbackError>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::ReplaceAll, &[], &[], Args::new)?;
        let result = delegate::replace_all(&mut self.store, function, Recorder::of(&mut pending));
        self.verifier.exit(&self.store, pending, result, |_| Outcome::Unit)
    }

    /// Visit every entry with write access through [`EntryMut::set_value`]
    ///
    /// Writes reach the store as they are made. The first error returned by
    /// `visitor` or raised by an entry check ends the traversal and puts back
    /// the old value of every entry written so far.
    pub fn for_each_entry_mut<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&mut EntryMut<'_, K, V>) -> Result<()>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::VisitEntries, &[], &[], Args::new)?;

        let verifier = &self.verifier;
        let store: &mut dyn BackingStore<K, V> = &mut self.store;
        let mut written = IndexMap::new();
        let mut failure = None;
        for (key, value) in store.entries() {
            let mut entry = EntryMut::new(&key, value, &mut *store, verifier);
            let visited = entry.check().and_then(|()| visitor(&mut entry));
            if let Some(write) = entry.into_write() {
                written.insert(key, write);
            }
            if let Err(err) = visited {
                failure = Some(err);
                break;
            }
        }

        let result = match failure {
            None => {
                let mut recorder = Recorder::of(&mut pending);
                for (key, (_, value)) in &written {
                    recorder.pair(key, value);
                }
                Ok(())
            }
            Some(err) => {
                for (key, (original, _)) in written {
                    store.put(key, original);
                }
                Err(err)
            }
        };
        self.verifier.exit(&self.store, pending, result, |_| Outcome::Unit)
    }

    // ========================================================================
    // Conditional mutators
    // ========================================================================

    /// Store `value` unless `key` holds a non-null value; returns the value
    /// held before the call
    pub fn put_if_absent(&mut self, key: K, value: V) -> Result<Option<V>> {
        let pending = self.verifier.enter(&self.store, Operation::PutIfAbsent, &[&key], &[&value], || {
            Args::new().with_key(key.clone()).with_value(value.clone())
        })?;
        let result = Ok(delegate::put_if_absent(&mut self.store, key, value));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Remove `key` only if it is mapped to `value`
    pub fn remove_entry(&mut self, key: &K, value: &V) -> Result<bool> {
        let pending = self.verifier.enter(&self.store, Operation::RemoveEntry, &[key], &[value], || {
            Args::new().with_key(key.clone()).with_value(value.clone())
        })?;
        let result = Ok(delegate::remove_entry(&mut self.store, key, value));
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    /// Map `key` to `value` only if it is currently mapped to `expected`
    pub fn replace_entry(&mut self, key: K, expected: &V, value: V) -> Result<bool> {
        let pending = self
            .verifier
            .enter(&self.store, Operation::ReplaceEntry, &[&key], &[expected, &value], || {
                Args::new()
                    .with_key(key.clone())
                    .with_expected(expected.clone())
                    .with_value(value.clone())
            })?;
        let result = Ok(delegate::replace_entry(&mut self.store, key, expected, value));
        self.verifier.exit(&self.store, pending, result, |b| Outcome::Bool(*b))
    }

    /// Map `key` to `value` only if `key` has an entry; returns the old value
    pub fn replace(&mut self, key: K, value: V) -> Result<Option<V>> {
        let pending = self.verifier.enter(&self.store, Operation::Replace, &[&key], &[&value], || {
            Args::new().with_key(key.clone()).with_value(value.clone())
        })?;
        let result = Ok(delegate::replace(&mut self.store, key, value));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    // ========================================================================
    // Compute family
    // ========================================================================

    /// If `key` is absent or null, store `function(key)` unless it yields
    /// `None`; returns the resulting value
    pub fn compute_if_absent(&mut self, key: K, function: impl FnOnce(&K) -> Option<V>) -> Result<Option<V>> {
        self.try_compute_if_absent(key, |k| Ok::<_, Infallible>(function(k)))
    }

    pub fn try_compute_if_absent<F, E>(&mut self, key: K, function: F) -> Result<Option<V>>
    where
        F: FnOnce(&K) -> std::result::Result<Option<V>, E>,
        E: Into<CallbackError>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::ComputeIfAbsent, &[&key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = delegate::compute_if_absent(&mut self.store, key, function, Recorder::of(&mut pending));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// If `key` holds a non-null value, replace it with `function(key, value)`
    /// or remove it when that yields `None`
    pub fn compute_if_present(
        &mut self,
        key: K,
        function: impl FnOnce(&K, &V) -> Option<V>,
    ) -> Result<Option<V>> {
        self.try_compute_if_present(key, |k, v| Ok::<_, Infallible>(function(k, v)))
    }

    pub fn try_compute_if_present<F, E>(&mut self, key: K, function: F) -> Result<Option<V>>
    where
        F: FnOnce(&K, &V) -> std::result::Result<Option<V>, E>,
        E: Into<CallbackError>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::ComputeIfPresent, &[&key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = delegate::compute_if_present(&mut self.store, key, function, Recorder::of(&mut pending));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Map `key` to `function(key, current)`, removing it when that yields `None`
    pub fn compute(&mut self, key: K, function: impl FnOnce(&K, Option<&V>) -> Option<V>) -> Result<Option<V>> {
        self.try_compute(key, |k, v| Ok::<_, Infallible>(function(k, v)))
    }

    pub fn try_compute<F, E>(&mut self, key: K, function: F) -> Result<Option<V>>
    where
        F: FnOnce(&K, Option<&V>) -> std::result::Result<Option<V>, E>,
        E: Into<CallbackError>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::Compute, &[&key], &[], || {
            Args::new().with_key(key.clone())
        })?;
        let result = delegate::compute(&mut self.store, key, function, Recorder::of(&mut pending));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }

    /// Store `value` if `key` is absent or null, otherwise
    /// `function(current, value)`; `None` removes the mapping
    pub fn merge(&mut self, key: K, value: V, function: impl FnOnce(&V, &V) -> Option<V>) -> Result<Option<V>> {
        self.try_merge(key, value, |old, new| Ok::<_, Infallible>(function(old, new)))
    }

    pub fn try_merge<F, E>(&mut self, key: K, value: V, function: F) -> Result<Option<V>>
    where
        F: FnOnce(&V, &V) -> std::result::Result<Option<V>, E>,
        E: Into<CallbackError>,
    {
        let mut pending = self.verifier.enter(&self.store, Operation::Merge, &[&key], &[&value], || {
            Args::new().with_key(key.clone()).with_value(value.clone())
        })?;
        let result = delegate::merge(&mut self.store, key, value, function, Recorder::of(&mut pending));
        self.verifier.exit(&self.store, pending, result, |v| Outcome::Value(v.clone()))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S: fmt::Debug> fmt::Debug for VerifiedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedMap")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tracing_test::traced_test;

    use super::*;
    use crate::error::{ErrorKind, MapError, PredicateKind};

    /// Store whose `put` silently drops every write
    #[derive(Debug, Default)]
    struct DroppingStore(HashStore<&'static str, i32>);

    impl MapView<&'static str, i32> for DroppingStore {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn get(&self, key: &&'static str) -> Option<i32> {
            self.0.get(key)
        }

        fn any_entry(&self, f: &mut dyn FnMut(&&'static str, &i32) -> bool) -> bool {
            self.0.any_entry(f)
        }

        fn capabilities(&self) -> Capabilities {
            self.0.capabilities()
        }
    }

    impl BackingStore<&'static str, i32> for DroppingStore {
        fn put(&mut self, _key: &'static str, _value: i32) -> Option<i32> {
            None
        }

        fn remove(&mut self, key: &&'static str) -> Option<i32> {
            self.0.remove(key)
        }

        fn clear(&mut self) {
            self.0.clear();
        }

        fn update_each(&mut self, f: &mut dyn FnMut(&&'static str, &mut i32)) {
            self.0.update_each(f);
        }
    }

    #[test]
    fn test_put_then_get() {
        let mut map = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        assert_eq!(map.put("one", 1).unwrap(), None);
        assert_eq!(map.put("one", 2).unwrap(), Some(1));
        assert_eq!(map.get(&"one").unwrap(), Some(2));
        assert_eq!(map.len().unwrap(), 1);
        assert!(map.stats().predicates_evaluated > 0);
        assert_eq!(map.stats().violations, 0);
    }

    #[traced_test]
    #[test]
    fn test_violation_is_logged() {
        let mut map = VerifiedMap::with_config(DroppingStore::default(), VerifyConfig::enforced());
        let err = map.put("k", 1).unwrap_err();

        let violation = err.violation().cloned().unwrap();
        assert_eq!(violation.operation, Operation::Put);
        assert_eq!(violation.predicate, "contains_entry");
        assert_eq!(violation.kind, PredicateKind::Postcondition);
        assert!(logs_contain("contract violation in `put`: postcondition `contains_entry` does not hold"));
    }

    #[test]
    fn test_disabled_map_passes_faulty_store_through() {
        let mut map = VerifiedMap::with_config(DroppingStore::default(), VerifyConfig::disabled());
        assert_eq!(map.put("k", 1).unwrap(), None);
        assert_eq!(map.get(&"k").unwrap(), None);
        assert_eq!(map.stats().predicates_evaluated, 0);
    }

    #[test]
    fn test_entry_set_value_writes_through() {
        let mut map = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        map.put_all([("a", 1), ("b", 2)]).unwrap();
        map.for_each_entry_mut(|entry| {
            let doubled = entry.value() * 2;
            let old = entry.set_value(doubled)?;
            assert_eq!(old * 2, *entry.value());
            Ok(())
        })
        .unwrap();
        assert_eq!(map.get(&"a").unwrap(), Some(2));
        assert_eq!(map.get(&"b").unwrap(), Some(4));
    }

    #[test]
    fn test_entry_set_value_requires_put() {
        let store = HashStore::from_entries([("a", 1)], Capabilities::all().with_put(false));
        let mut map = VerifiedMap::with_config(store, VerifyConfig::enforced());
        let err = map.for_each_entry_mut(|entry| entry.set_value(5).map(drop)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.operation(), Operation::EntrySetValue);
        assert_eq!(map.get(&"a").unwrap(), Some(1));
    }

    #[test]
    fn test_failed_traversal_restores_entries() {
        let mut map = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        map.put_all([("a", 1), ("b", 2), ("c", 3)]).unwrap();
        let before = map.snapshot();

        let mut visited = 0;
        let err = map
            .for_each_entry_mut(|entry| {
                visited += 1;
                if visited == 3 {
                    return Err(MapError::callback(Operation::VisitEntries, "stop"));
                }
                let value = *entry.value();
                entry.set_value(value * 100).map(drop)
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Callback);
        assert_eq!(map.snapshot(), before);
        assert_eq!(map.stats().violations, 0);
    }

    #[test]
    fn test_dropped_entry_write_is_detected() {
        let inner = HashStore::from_entries([("a", 1)], Capabilities::all());
        let mut map = VerifiedMap::with_config(DroppingStore(inner), VerifyConfig::enforced());
        let err = map.for_each_entry_mut(|entry| entry.set_value(99).map(drop)).unwrap_err();

        let violation = err.violation().cloned().unwrap();
        assert_eq!(violation.operation, Operation::EntrySetValue);
        assert_eq!(violation.predicate, "has_value");
        assert_eq!(violation.kind, PredicateKind::EntryPostcondition);
        assert_eq!(map.get(&"a").unwrap(), Some(1));
    }

    /// Store that counts full scans
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: HashStore<&'static str, i32>,
        scans: Cell<usize>,
    }

    impl MapView<&'static str, i32> for CountingStore {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn get(&self, key: &&'static str) -> Option<i32> {
            self.inner.get(key)
        }

        fn any_entry(&self, f: &mut dyn FnMut(&&'static str, &i32) -> bool) -> bool {
            self.scans.set(self.scans.get() + 1);
            self.inner.any_entry(f)
        }

        fn capabilities(&self) -> Capabilities {
            self.inner.capabilities()
        }
    }

    impl BackingStore<&'static str, i32> for CountingStore {
        fn put(&mut self, key: &'static str, value: i32) -> Option<i32> {
            self.inner.put(key, value)
        }

        fn remove(&mut self, key: &&'static str) -> Option<i32> {
            self.inner.remove(key)
        }

        fn clear(&mut self) {
            self.inner.clear();
        }

        fn update_each(&mut self, f: &mut dyn FnMut(&&'static str, &mut i32)) {
            self.inner.update_each(f);
        }
    }

    #[test]
    fn test_disabled_traversal_scans_once() {
        let store = CountingStore {
            inner: HashStore::from_entries([("a", 1), ("b", 2)], Capabilities::all()),
            scans: Cell::new(0),
        };
        let mut map = VerifiedMap::with_config(store, VerifyConfig::disabled());
        map.for_each_entry_mut(|entry| {
            let value = *entry.value();
            entry.set_value(value + 1).map(drop)
        })
        .unwrap();

        assert_eq!(map.store().scans.get(), 1);
        assert_eq!(map.get(&"a").unwrap(), Some(2));
    }

    #[test]
    fn test_callback_error_leaves_state() {
        let mut map = VerifiedMap::with_config(HashStore::new(), VerifyConfig::enforced());
        map.put("a", 1).unwrap();
        let err = map
            .try_compute("a", |_, _| Err::<Option<i32>, _>("refused"))
            .unwrap_err();
        assert!(matches!(err, MapError::Callback { operation: Operation::Compute, .. }));
        assert_eq!(map.get(&"a").unwrap(), Some(1));
    }
}
