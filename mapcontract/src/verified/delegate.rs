//! Derived operations built from store primitives
//!
//! A stored null counts as absent for `put_if_absent` and the compute family.
//! Function results pass through [`non_null`], so a function yielding null
//! removes the mapping instead of storing it.

use indexmap::IndexMap;

use crate::contract::Operation;
use crate::error::{CallbackError, MapError, Result};
use crate::item::{MapItem, MapKey, non_null};
use crate::view::BackingStore;

use super::verifier::Recorder;

pub(crate) fn put_if_absent<K, V, S>(store: &mut S, key: K, value: V) -> Option<V>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
{
    let current = store.get(&key);
    if non_null(current.clone()).is_none() {
        store.put(key, value);
    }
    current
}

pub(crate) fn remove_entry<K, V, S>(store: &mut S, key: &K, value: &V) -> bool
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
{
    if store.get(key).as_ref() != Some(value) {
        return false;
    }
    store.remove(key);
    true
}

pub(crate) fn replace_entry<K, V, S>(store: &mut S, key: K, expected: &V, value: V) -> bool
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
{
    if store.get(&key).as_ref() != Some(expected) {
        return false;
    }
    store.put(key, value);
    true
}

pub(crate) fn replace<K, V, S>(store: &mut S, key: K, value: V) -> Option<V>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
{
    if store.contains_key(&key) {
        store.put(key, value)
    } else {
        None
    }
}

/// Store `produced` under `key`, or remove the mapping when it is `None`
fn store_or_remove<K, V, S>(store: &mut S, key: K, produced: &Option<V>)
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
{
    match produced {
        Some(value) => {
            store.put(key, value.clone());
        }
        None => {
            if store.contains_key(&key) {
                store.remove(&key);
            }
        }
    }
}

pub(crate) fn compute_if_absent<K, V, S, F, E>(
    store: &mut S,
    key: K,
    function: F,
    mut recorder: Recorder<'_, K, V>,
) -> Result<Option<V>>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
    F: FnOnce(&K) -> std::result::Result<Option<V>, E>,
    E: Into<CallbackError>,
{
    if let Some(current) = non_null(store.get(&key)) {
        return Ok(Some(current));
    }
    let produced = non_null(function(&key).map_err(|e| MapError::callback(Operation::ComputeIfAbsent, e))?);
    recorder.produced(&produced);
    if let Some(value) = &produced {
        store.put(key, value.clone());
    }
    Ok(produced)
}

pub(crate) fn compute_if_present<K, V, S, F, E>(
    store: &mut S,
    key: K,
    function: F,
    mut recorder: Recorder<'_, K, V>,
) -> Result<Option<V>>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
    F: FnOnce(&K, &V) -> std::result::Result<Option<V>, E>,
    E: Into<CallbackError>,
{
    let Some(current) = non_null(store.get(&key)) else {
        return Ok(None);
    };
    let produced =
        non_null(function(&key, &current).map_err(|e| MapError::callback(Operation::ComputeIfPresent, e))?);
    recorder.produced(&produced);
    store_or_remove(store, key, &produced);
    Ok(produced)
}

pub(crate) fn compute<K, V, S, F, E>(
    store: &mut S,
    key: K,
    function: F,
    mut recorder: Recorder<'_, K, V>,
) -> Result<Option<V>>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
    F: FnOnce(&K, Option<&V>) -> std::result::Result<Option<V>, E>,
    E: Into<CallbackError>,
{
    let current = non_null(store.get(&key));
    let produced =
        non_null(function(&key, current.as_ref()).map_err(|e| MapError::callback(Operation::Compute, e))?);
    recorder.produced(&produced);
    store_or_remove(store, key, &produced);
    Ok(produced)
}

pub(crate) fn merge<K, V, S, F, E>(
    store: &mut S,
    key: K,
    value: V,
    function: F,
    mut recorder: Recorder<'_, K, V>,
) -> Result<Option<V>>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
    F: FnOnce(&V, &V) -> std::result::Result<Option<V>, E>,
    E: Into<CallbackError>,
{
    let produced = match non_null(store.get(&key)) {
        None => Some(value),
        Some(current) => non_null(function(&current, &value).map_err(|e| MapError::callback(Operation::Merge, e))?),
    };
    recorder.produced(&produced);
    store_or_remove(store, key, &produced);
    Ok(produced)
}

/// Replace every value with `function(key, value)`
///
/// All replacements are computed before the first write, so a failing
/// function or a null replacement leaves the store untouched.
pub(crate) fn replace_all<K, V, S, F, E>(store: &mut S, mut function: F, mut recorder: Recorder<'_, K, V>) -> Result<()>
where
    K: MapKey,
    V: MapItem,
    S: BackingStore<K, V>,
    F: FnMut(&K, &V) -> std::result::Result<V, E>,
    E: Into<CallbackError>,
{
    let op = Operation::ReplaceAll;
    let mut replacements = IndexMap::with_capacity(store.len());
    for (key, value) in store.entries() {
        let replacement = function(&key, &value).map_err(|e| MapError::callback(op, e))?;
        replacements.insert(key, replacement);
    }
    if !store.capabilities().null_items && replacements.values().any(MapItem::is_null) {
        return Err(MapError::null_value(op));
    }

    for (key, value) in &replacements {
        recorder.pair(key, value);
    }
    store.update_each(&mut |key, value| {
        if let Some(replacement) = replacements.get(key) {
            *value = replacement.clone();
        }
    });
    Ok(())
}
