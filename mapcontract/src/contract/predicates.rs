//! Predicate functions of the standard map contract
//!
//! Every predicate is a pure function. A predicate whose argument was not
//! recorded (e.g. a `put` postcondition run without a key) evaluates to false.
//! Old state is always read from the snapshot, new state from the store.

use std::collections::{HashMap, HashSet};

use crate::item::{MapItem, MapKey, entry_hash, non_null};
use crate::view::MapView;

use super::{Check, EntryCheck, EntryPredicate, Invariant, Operation, Outcome, Postcondition};

/// `post![a, b; on_error: c]` builds the ordered postcondition list
macro_rules! post {
    ($($name:ident),* $(; on_error: $($err:ident),*)?) => {
        vec![
            $(Postcondition::new(stringify!($name), $name::<K, V>),)*
            $($(Postcondition::on_error(stringify!($err), $err::<K, V>),)*)?
        ]
    };
}

pub(super) fn postconditions<K: MapKey, V: MapItem>(op: Operation) -> Vec<Postcondition<K, V>> {
    match op {
        Operation::Size => post![returns_entry_count],
        Operation::IsEmpty => post![returns_iff_size_is_zero],
        Operation::ContainsKey => post![returns_iff_key_exists],
        Operation::ContainsValue => post![returns_iff_value_exists],
        Operation::Get => post![returns_stored_value],
        Operation::Put => post![
            contains_entry,
            size_increases_iff_key_absent,
            returns_old_value,
            other_entries_unchanged
        ],
        Operation::Remove => post![
            not_contains_key,
            size_decreases_iff_key_present,
            returns_old_value,
            other_entries_unchanged
        ],
        Operation::PutAll => post![contains_all_entries, size_increased_for_each_key_absent],
        Operation::Clear => post![is_empty],
        Operation::Keys => post![keys_of_same_size, each_key_is_stored],
        Operation::Values => post![values_of_same_size, each_value_is_stored],
        Operation::Entries => post![entries_of_same_size, each_entry_is_stored],
        Operation::Equals => post![returns_pairwise_equals, returns_same_hash_code],
        Operation::HashCode => post![returns_sum_of_entry_hashes],
        Operation::GetOrDefault => post![value_if_contains_key_else_default],
        Operation::ForEach => post![visits_every_entry, size_not_changed, entries_not_changed],
        Operation::ReplaceAll => post![
            size_not_changed,
            keys_not_changed,
            values_replaced_by_function;
            on_error: unchanged_on_error
        ],
        Operation::VisitEntries => post![
            size_not_changed,
            keys_not_changed,
            entry_writes_applied;
            on_error: unchanged_on_error
        ],
        // checked per entry, see `entry_postconditions`
        Operation::EntrySetValue => post![],
        Operation::PutIfAbsent => post![
            returns_old_value,
            value_changes_only_if_absent_or_null,
            size_increases_iff_key_absent,
            other_entries_unchanged
        ],
        Operation::RemoveEntry => post![
            returns_iff_entry_deleted,
            size_decreased_iff_contained_entry,
            value_unchanged_if_not_contained_entry,
            other_entries_unchanged
        ],
        Operation::ReplaceEntry => post![
            returns_iff_entry_replaced,
            size_not_changed,
            keys_not_changed,
            value_changes_only_if_contained_entry,
            other_entries_unchanged
        ],
        Operation::Replace => post![
            returns_old_value,
            size_not_changed,
            contains_entry_iff_key_contained,
            other_entries_unchanged
        ],
        Operation::ComputeIfAbsent => post![
            computes_only_if_absent_or_null,
            stores_computed_value_if_absent,
            other_entries_unchanged;
            on_error: unchanged_on_error
        ],
        Operation::ComputeIfPresent => post![
            computes_only_if_present,
            stores_or_removes_computed_value,
            size_follows_computed_value,
            other_entries_unchanged;
            on_error: unchanged_on_error
        ],
        Operation::Compute => post![
            function_always_applied,
            stores_or_removes_computed_value,
            size_follows_computed_value,
            other_entries_unchanged;
            on_error: unchanged_on_error
        ],
        Operation::Merge => post![
            merges_absent_key_with_value,
            stores_or_removes_computed_value,
            size_follows_computed_value,
            other_entries_unchanged;
            on_error: unchanged_on_error
        ],
    }
}

pub(super) fn invariants<K: MapKey, V: MapItem>() -> Vec<Invariant<K, V>> {
    vec![
        Invariant::new("size_matches_entry_count", size_matches_entry_count::<K, V>),
        Invariant::new("empty_iff_size_zero", empty_iff_size_zero::<K, V>),
        Invariant::new("hash_code_is_valid", hash_code_is_valid::<K, V>),
        Invariant::new("null_policy_respected", null_policy_respected::<K, V>),
    ]
}

pub(super) fn entry_invariants<K: MapKey, V: MapItem>() -> Vec<EntryPredicate<K, V>> {
    vec![EntryPredicate::new("entry_hash_is_valid", entry_hash_is_valid::<K, V>)]
}

pub(super) fn entry_postconditions<K: MapKey, V: MapItem>() -> Vec<EntryPredicate<K, V>> {
    vec![
        EntryPredicate::new("has_value", has_value::<K, V>),
        EntryPredicate::new("returns_old_value", entry_returns_old_value::<K, V>),
    ]
}

// ============================================================================
// Invariants
// ============================================================================

// Invariants walk entries through `any_entry`, the one traversal every store
// must implement, so an overridden `for_each_entry` is judged against it.

fn entry_count<K, V>(view: &dyn MapView<K, V>) -> usize {
    let mut count = 0;
    view.any_entry(&mut |_, _| {
        count += 1;
        false
    });
    count
}

fn size_matches_entry_count<K: MapKey, V: MapItem>(view: &dyn MapView<K, V>) -> bool {
    view.len() == entry_count(view)
}

fn empty_iff_size_zero<K: MapKey, V: MapItem>(view: &dyn MapView<K, V>) -> bool {
    view.is_empty() == (view.len() == 0)
}

fn hash_code_is_valid<K: MapKey, V: MapItem>(view: &dyn MapView<K, V>) -> bool {
    let mut sum = 0u64;
    view.any_entry(&mut |k, v| {
        sum = sum.wrapping_add(entry_hash(k, v));
        false
    });
    view.hash_code() == sum
}

fn null_policy_respected<K: MapKey, V: MapItem>(view: &dyn MapView<K, V>) -> bool {
    view.capabilities().null_items || !view.any_entry(&mut |k, v| k.is_null() || v.is_null())
}

// ============================================================================
// Shared building blocks
// ============================================================================

fn returned_value<'c, K, V>(c: &Check<'c, K, V>) -> Option<&'c Option<V>> {
    c.outcome.as_value()
}

/// Every entry of the old state other than `key` is present with the same
/// value, and nothing other than `key` was added
fn unchanged_except<K: MapKey, V: MapItem>(c: &Check<'_, K, V>, key: &K) -> bool {
    let kept = !c.old.any_entry(&mut |k, v| k != key && c.new.get(k).as_ref() != Some(v));
    let added = c.new.any_entry(&mut |k, _| k != key && !c.old.contains_key(k));
    kept && !added
}

fn same_entries<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.old.len() == c.new.len() && !c.old.any_entry(&mut |k, v| c.new.get(k).as_ref() != Some(v))
}

/// Size after storing (`stored`) or removing the entry for `key`
fn size_after<K: MapKey, V: MapItem>(c: &Check<'_, K, V>, key: &K, stored: bool) -> bool {
    let present = c.old.contains_key(key);
    match (stored, present) {
        (true, false) => c.new.len() == c.old.len() + 1,
        (false, true) => c.new.len() + 1 == c.old.len(),
        _ => c.new.len() == c.old.len(),
    }
}

// ============================================================================
// Queries
// ============================================================================

fn returns_entry_count<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.outcome.as_len() == Some(c.old.len())
}

fn returns_iff_size_is_zero<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.outcome.as_bool() == Some(c.old.len() == 0)
}

fn returns_iff_key_exists<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    c.outcome.as_bool() == Some(c.old.any_entry(&mut |k, _| k == key))
}

fn returns_iff_value_exists<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(value) = c.args.value.as_ref() else {
        return false;
    };
    c.outcome.as_bool() == Some(c.old.any_entry(&mut |_, v| v == value))
}

fn returns_stored_value<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    returned_value(c) == Some(&c.old.get(key))
}

fn value_if_contains_key_else_default<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    let expected = c.old.get(key).or_else(|| c.args.default.clone());
    returned_value(c) == Some(&expected)
}

fn keys_of_same_size<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(c.outcome, Outcome::Keys(keys) if keys.len() == c.new.len())
}

fn each_key_is_stored<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(c.outcome, Outcome::Keys(keys) if keys.iter().all(|k| c.new.contains_key(k)))
}

fn values_of_same_size<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(c.outcome, Outcome::Values(values) if values.len() == c.new.len())
}

fn each_value_is_stored<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(c.outcome, Outcome::Values(values) if values.iter().all(|v| c.new.contains_value(v)))
}

fn entries_of_same_size<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(c.outcome, Outcome::Entries(entries) if entries.len() == c.new.len())
}

fn each_entry_is_stored<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    matches!(
        c.outcome,
        Outcome::Entries(entries) if entries.iter().all(|(k, v)| c.new.get(k).as_ref() == Some(v))
    )
}

fn returns_pairwise_equals<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(other) = c.args.other.as_ref() else {
        return false;
    };
    let equal = c.old.len() == other.len() && !c.old.any_entry(&mut |k, v| other.get(k).as_ref() != Some(v));
    c.outcome.as_bool() == Some(equal)
}

fn returns_same_hash_code<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(other) = c.args.other.as_ref() else {
        return false;
    };
    c.outcome.as_bool() != Some(true) || c.old.hash_code() == other.hash_code()
}

fn returns_sum_of_entry_hashes<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let mut sum = 0u64;
    for (k, v) in c.old.iter() {
        sum = sum.wrapping_add(entry_hash(k, v));
    }
    matches!(c.outcome, Outcome::Hash(h) if *h == sum)
}

// ============================================================================
// Core mutators
// ============================================================================

fn contains_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    match (c.args.key.as_ref(), c.args.value.as_ref()) {
        (Some(key), Some(value)) => c.new.get(key).as_ref() == Some(value),
        _ => false,
    }
}

fn size_increases_iff_key_absent<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    size_after(c, key, true)
}

fn returns_old_value<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    returned_value(c) == Some(&c.old.get(key))
}

fn other_entries_unchanged<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    unchanged_except(c, key)
}

fn not_contains_key<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    !c.new.contains_key(key)
}

fn size_decreases_iff_key_present<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    size_after(c, key, false)
}

fn contains_all_entries<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(other) = c.args.other.as_ref() else {
        return false;
    };
    other.iter().all(|(k, v)| c.new.get(k).as_ref() == Some(v))
}

fn size_increased_for_each_key_absent<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(other) = c.args.other.as_ref() else {
        return false;
    };
    let added = other.iter().filter(|(k, _)| !c.old.contains_key(k)).count();
    c.new.len() == c.old.len() + added
}

fn is_empty<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.new.is_empty() && entry_count(c.new) == 0
}

// ============================================================================
// Traversal
// ============================================================================

fn visits_every_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let distinct: HashSet<&K> = c.args.pairs.iter().map(|(k, _)| k).collect();
    distinct.len() == c.args.pairs.len()
        && c.args.pairs.len() == c.old.len()
        && c.args.pairs.iter().all(|(k, v)| c.old.get(k).as_ref() == Some(v))
}

fn size_not_changed<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.new.len() == c.old.len()
}

fn keys_not_changed<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.new.len() == c.old.len() && c.old.iter().all(|(k, _)| c.new.contains_key(k))
}

fn entries_not_changed<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    same_entries(c)
}

fn values_replaced_by_function<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.args.pairs.len() == c.old.len()
        && c.args
            .pairs
            .iter()
            .all(|(k, v)| c.old.contains_key(k) && c.new.get(k).as_ref() == Some(v))
}

/// Every recorded write is stored; every other entry keeps its old value
fn entry_writes_applied<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let written: HashMap<&K, &V> = c.args.pairs.iter().map(|(k, v)| (k, v)).collect();
    written.keys().all(|k| c.old.contains_key(k))
        && c.new.len() == c.old.len()
        && c.old.iter().all(|(k, v)| {
            let expected = written.get(k).copied().unwrap_or(v);
            c.new.get(k).as_ref() == Some(expected)
        })
}

fn unchanged_on_error<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    same_entries(c)
}

// ============================================================================
// Conditional mutators
// ============================================================================

fn value_changes_only_if_absent_or_null<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(value)) = (c.args.key.as_ref(), c.args.value.as_ref()) else {
        return false;
    };
    match non_null(c.old.get(key)) {
        None => c.new.get(key).as_ref() == Some(value),
        existing => c.new.get(key) == existing,
    }
}

/// Old state held exactly the (key, expected) entry
fn contained_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>, expected: &V) -> Option<bool> {
    let key = c.args.key.as_ref()?;
    Some(c.old.get(key).as_ref() == Some(expected))
}

fn returns_iff_entry_deleted<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(value) = c.args.value.as_ref() else {
        return false;
    };
    contained_entry(c, value).is_some_and(|contained| c.outcome.as_bool() == Some(contained))
}

fn size_decreased_iff_contained_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(value)) = (c.args.key.as_ref(), c.args.value.as_ref()) else {
        return false;
    };
    if c.old.get(key).as_ref() == Some(value) {
        c.new.len() + 1 == c.old.len() && !c.new.contains_key(key)
    } else {
        c.new.len() == c.old.len()
    }
}

fn value_unchanged_if_not_contained_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(value)) = (c.args.key.as_ref(), c.args.value.as_ref()) else {
        return false;
    };
    c.old.get(key).as_ref() == Some(value) || c.new.get(key) == c.old.get(key)
}

fn returns_iff_entry_replaced<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(expected) = c.args.expected.as_ref() else {
        return false;
    };
    contained_entry(c, expected).is_some_and(|contained| c.outcome.as_bool() == Some(contained))
}

fn value_changes_only_if_contained_entry<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(expected), Some(value)) =
        (c.args.key.as_ref(), c.args.expected.as_ref(), c.args.value.as_ref())
    else {
        return false;
    };
    if c.old.get(key).as_ref() == Some(expected) {
        c.new.get(key).as_ref() == Some(value)
    } else {
        c.new.get(key) == c.old.get(key)
    }
}

fn contains_entry_iff_key_contained<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(value)) = (c.args.key.as_ref(), c.args.value.as_ref()) else {
        return false;
    };
    if c.old.contains_key(key) {
        c.new.get(key).as_ref() == Some(value)
    } else {
        !c.new.contains_key(key)
    }
}

// ============================================================================
// Compute family
//
// `args.produced` is `None` when the function was not invoked, otherwise the
// value it produced with nulls folded into `None`.
// ============================================================================

fn computes_only_if_absent_or_null<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    c.args.produced.is_some() == non_null(c.old.get(key)).is_none()
}

fn stores_computed_value_if_absent<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    let stored = match &c.args.produced {
        Some(Some(value)) => c.new.get(key).as_ref() == Some(value),
        _ => c.new.get(key) == c.old.get(key),
    };
    stored && returned_value(c) == Some(&non_null(c.new.get(key)))
}

fn computes_only_if_present<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    c.args.produced.is_some() == non_null(c.old.get(key)).is_some()
}

fn function_always_applied<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    c.args.produced.is_some()
}

fn merges_absent_key_with_value<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let (Some(key), Some(value)) = (c.args.key.as_ref(), c.args.value.as_ref()) else {
        return false;
    };
    non_null(c.old.get(key)).is_some() || c.new.get(key).as_ref() == Some(value)
}

fn stores_or_removes_computed_value<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    let stored = match &c.args.produced {
        Some(Some(value)) => c.new.get(key).as_ref() == Some(value),
        Some(None) => !c.new.contains_key(key),
        None => c.new.get(key) == c.old.get(key),
    };
    let expected = c.args.produced.as_ref().and_then(Option::as_ref);
    stored && returned_value(c).map(Option::as_ref) == Some(expected)
}

fn size_follows_computed_value<K: MapKey, V: MapItem>(c: &Check<'_, K, V>) -> bool {
    let Some(key) = c.args.key.as_ref() else {
        return false;
    };
    match &c.args.produced {
        Some(produced) => size_after(c, key, produced.is_some()),
        None => c.new.len() == c.old.len(),
    }
}

// ============================================================================
// Entries
// ============================================================================

/// The entry hashes like the entry the store returns for its key
fn entry_hash_is_valid<K: MapKey, V: MapItem>(c: &EntryCheck<'_, K, V>) -> bool {
    c.stored.is_some_and(|stored| c.hash == entry_hash(c.key, stored))
}

/// The store now holds the written value, and so does the entry
fn has_value<K: MapKey, V: MapItem>(c: &EntryCheck<'_, K, V>) -> bool {
    c.argument.is_some_and(|argument| c.stored == Some(argument) && c.value == argument)
}

/// The store replaced exactly the value the entry held
fn entry_returns_old_value<K: MapKey, V: MapItem>(c: &EntryCheck<'_, K, V>) -> bool {
    c.returned.is_some() && c.returned == c.old_value
}
