//! Contract registry
//!
//! Associates every public map operation with its preconditions
//! ([`Requirement`]s, which map to caller errors) and its postconditions
//! (predicates over old state, new state, arguments and outcome). Container
//! invariants and entry contracts are held alongside.
//!
//! The association is fixed in code: each operation lists its predicate
//! functions explicitly, in evaluation order.

mod predicates;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::item::{MapItem, MapKey};
use crate::snapshot::Snapshot;
use crate::view::MapView;

/// Public operations of a verified map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Size,
    IsEmpty,
    ContainsKey,
    ContainsValue,
    Get,
    Put,
    Remove,
    PutAll,
    Clear,
    Keys,
    Values,
    Entries,
    Equals,
    HashCode,
    GetOrDefault,
    ForEach,
    ReplaceAll,
    VisitEntries,
    EntrySetValue,
    PutIfAbsent,
    RemoveEntry,
    ReplaceEntry,
    Replace,
    ComputeIfAbsent,
    ComputeIfPresent,
    Compute,
    Merge,
}

impl Operation {
    pub const ALL: [Operation; 27] = [
        Operation::Size,
        Operation::IsEmpty,
        Operation::ContainsKey,
        Operation::ContainsValue,
        Operation::Get,
        Operation::Put,
        Operation::Remove,
        Operation::PutAll,
        Operation::Clear,
        Operation::Keys,
        Operation::Values,
        Operation::Entries,
        Operation::Equals,
        Operation::HashCode,
        Operation::GetOrDefault,
        Operation::ForEach,
        Operation::ReplaceAll,
        Operation::VisitEntries,
        Operation::EntrySetValue,
        Operation::PutIfAbsent,
        Operation::RemoveEntry,
        Operation::ReplaceEntry,
        Operation::Replace,
        Operation::ComputeIfAbsent,
        Operation::ComputeIfPresent,
        Operation::Compute,
        Operation::Merge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Size => "size",
            Operation::IsEmpty => "is_empty",
            Operation::ContainsKey => "contains_key",
            Operation::ContainsValue => "contains_value",
            Operation::Get => "get",
            Operation::Put => "put",
            Operation::Remove => "remove",
            Operation::PutAll => "put_all",
            Operation::Clear => "clear",
            Operation::Keys => "keys",
            Operation::Values => "values",
            Operation::Entries => "entries",
            Operation::Equals => "equals",
            Operation::HashCode => "hash_code",
            Operation::GetOrDefault => "get_or_default",
            Operation::ForEach => "for_each",
            Operation::ReplaceAll => "replace_all",
            Operation::VisitEntries => "for_each_entry_mut",
            Operation::EntrySetValue => "entry_set_value",
            Operation::PutIfAbsent => "put_if_absent",
            Operation::RemoveEntry => "remove_entry",
            Operation::ReplaceEntry => "replace_entry",
            Operation::Replace => "replace",
            Operation::ComputeIfAbsent => "compute_if_absent",
            Operation::ComputeIfPresent => "compute_if_present",
            Operation::Compute => "compute",
            Operation::Merge => "merge",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A precondition; a failing one is reported as a caller error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// `put` capability (raises `Unsupported`)
    PutSupported,
    /// `remove` capability (raises `Unsupported`)
    RemoveSupported,
    /// `clear` capability (raises `Unsupported`)
    ClearSupported,
    /// Key is non-null unless nulls are supported (raises `NullKey`)
    KeyNullPolicy,
    /// Value is non-null unless nulls are supported (raises `NullValue`)
    ValueNullPolicy,
    /// Value is non-null regardless of capabilities (raises `NullValue`)
    ValueNotNull,
    /// Key type matches the stored keys (raises `WrongKeyType`)
    KeyType,
    /// Value type matches the stored values (raises `WrongValueType`)
    ValueType,
}

impl Requirement {
    pub fn as_str(self) -> &'static str {
        match self {
            Requirement::PutSupported => "put_supported",
            Requirement::RemoveSupported => "remove_supported",
            Requirement::ClearSupported => "clear_supported",
            Requirement::KeyNullPolicy => "key_null_policy",
            Requirement::ValueNullPolicy => "value_null_policy",
            Requirement::ValueNotNull => "value_not_null",
            Requirement::KeyType => "key_type",
            Requirement::ValueType => "value_type",
        }
    }
}

/// Preconditions of `op`, in evaluation order
pub fn requirements(op: Operation) -> &'static [Requirement] {
    use Requirement::*;

    const LOOKUP: &[Requirement] = &[KeyNullPolicy, KeyType];
    const WRITE: &[Requirement] = &[PutSupported, KeyNullPolicy, ValueNullPolicy, KeyType, ValueType];

    match op {
        Operation::Size
        | Operation::IsEmpty
        | Operation::Keys
        | Operation::Values
        | Operation::Entries
        | Operation::Equals
        | Operation::HashCode
        | Operation::ForEach
        | Operation::VisitEntries => &[],
        Operation::ContainsKey | Operation::Get | Operation::GetOrDefault => LOOKUP,
        Operation::ContainsValue => &[ValueNullPolicy, ValueType],
        Operation::Put
        | Operation::PutAll
        | Operation::PutIfAbsent
        | Operation::ReplaceEntry
        | Operation::Replace => WRITE,
        Operation::Remove => &[RemoveSupported, KeyNullPolicy, KeyType],
        Operation::RemoveEntry => &[RemoveSupported, KeyNullPolicy, ValueNullPolicy, KeyType, ValueType],
        Operation::Clear => &[ClearSupported],
        Operation::ReplaceAll => &[PutSupported],
        Operation::EntrySetValue => &[PutSupported, ValueNullPolicy, ValueType],
        Operation::ComputeIfAbsent => &[PutSupported, KeyNullPolicy, KeyType],
        Operation::ComputeIfPresent | Operation::Compute => {
            &[PutSupported, RemoveSupported, KeyNullPolicy, KeyType]
        }
        Operation::Merge => &[
            PutSupported,
            RemoveSupported,
            KeyNullPolicy,
            ValueNotNull,
            KeyType,
            ValueType,
        ],
    }
}

/// Type established by the items already stored in a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeWitness {
    pub key: Option<&'static str>,
    pub value: Option<&'static str>,
}

impl TypeWitness {
    /// Tags of the first non-null key and the first non-null value
    pub fn of<K: MapKey, V: MapItem, M: MapView<K, V> + ?Sized>(view: &M) -> Self {
        let mut witness = Self::default();
        view.any_entry(&mut |k, v| {
            if witness.key.is_none() {
                witness.key = k.type_tag();
            }
            if witness.value.is_none() {
                witness.value = v.type_tag();
            }
            witness.key.is_some() && witness.value.is_some()
        });
        witness
    }
}

/// Arguments of a call, as seen by its postconditions
#[derive(Debug, Clone)]
pub struct Args<K, V> {
    pub key: Option<K>,
    pub value: Option<V>,
    /// Value the current mapping must equal (`replace_entry`)
    pub expected: Option<V>,
    pub default: Option<V>,
    /// Mapping argument (`put_all`, `equals`)
    pub other: Option<Snapshot<K, V>>,
    /// Result of the caller's function; `None` if it was never invoked
    pub produced: Option<Option<V>>,
    /// Entries visited by `for_each`, or replacements made by `replace_all`
    pub pairs: Vec<(K, V)>,
}

impl<K, V> Args<K, V> {
    pub fn new() -> Self {
        Self {
            key: None,
            value: None,
            expected: None,
            default: None,
            other: None,
            produced: None,
            pairs: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: K) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_expected(mut self, expected: V) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_default(mut self, default: V) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_other(mut self, other: Snapshot<K, V>) -> Self {
        self.other = Some(other);
        self
    }
}

impl<K, V> Default for Args<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// What a call produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<K, V> {
    Unit,
    Bool(bool),
    Len(usize),
    /// A value or the absent marker
    Value(Option<V>),
    Hash(u64),
    Keys(Vec<K>),
    Values(Vec<V>),
    Entries(Vec<(K, V)>),
    /// The call raised an error
    Failed,
}

impl<K, V> Outcome<K, V> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Outcome::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_len(&self) -> Option<usize> {
        match self {
            Outcome::Len(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Option<V>> {
        match self {
            Outcome::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Everything a postcondition may read
pub struct Check<'a, K, V> {
    /// State before the call
    pub old: &'a Snapshot<K, V>,
    /// State after the call
    pub new: &'a dyn MapView<K, V>,
    pub args: &'a Args<K, V>,
    pub outcome: &'a Outcome<K, V>,
}

/// Everything an entry predicate may read
///
/// `value` and `hash` come from the traversal, `stored` and `returned` from
/// the store itself, so a store whose traversal disagrees with its lookups or
/// whose writes go missing is caught.
pub struct EntryCheck<'a, K, V> {
    pub key: &'a K,
    /// Current value of the entry
    pub value: &'a V,
    /// Hash reported by the entry
    pub hash: u64,
    /// Value the store returns for `key` when asked directly
    pub stored: Option<&'a V>,
    /// Value passed to `set_value`
    pub argument: Option<&'a V>,
    /// Value the entry held before `set_value`
    pub old_value: Option<&'a V>,
    /// Previous value reported by the store for the write
    pub returned: Option<&'a V>,
}

pub type PostconditionFn<K, V> = fn(&Check<'_, K, V>) -> bool;
pub type InvariantFn<K, V> = fn(&dyn MapView<K, V>) -> bool;
pub type EntryPredicateFn<K, V> = fn(&EntryCheck<'_, K, V>) -> bool;

/// Named postcondition
pub struct Postcondition<K, V> {
    pub name: &'static str,
    pub check: PostconditionFn<K, V>,
    /// Evaluated when the call raised an error instead of when it succeeded
    pub on_error: bool,
}

impl<K, V> Postcondition<K, V> {
    pub fn new(name: &'static str, check: PostconditionFn<K, V>) -> Self {
        Self { name, check, on_error: false }
    }

    pub fn on_error(name: &'static str, check: PostconditionFn<K, V>) -> Self {
        Self { name, check, on_error: true }
    }
}

/// Named container invariant
pub struct Invariant<K, V> {
    pub name: &'static str,
    pub check: InvariantFn<K, V>,
}

impl<K, V> Invariant<K, V> {
    pub fn new(name: &'static str, check: InvariantFn<K, V>) -> Self {
        Self { name, check }
    }
}

/// Named entry predicate
pub struct EntryPredicate<K, V> {
    pub name: &'static str,
    pub check: EntryPredicateFn<K, V>,
}

impl<K, V> EntryPredicate<K, V> {
    pub fn new(name: &'static str, check: EntryPredicateFn<K, V>) -> Self {
        Self { name, check }
    }
}

// fn pointers are Copy whatever K and V are; derives would demand K: Copy
macro_rules! impl_copy_debug {
    ($($ty:ident),*) => {
        $(
            impl<K, V> Clone for $ty<K, V> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<K, V> Copy for $ty<K, V> {}

            impl<K, V> fmt::Debug for $ty<K, V> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name)
                }
            }
        )*
    };
}

impl_copy_debug!(Postcondition, Invariant, EntryPredicate);

/// Pre- and postconditions of one operation
#[derive(Debug)]
pub struct Contract<K, V> {
    pub requires: &'static [Requirement],
    pub ensures: Vec<Postcondition<K, V>>,
}

impl<K, V> Clone for Contract<K, V> {
    fn clone(&self) -> Self {
        Self {
            requires: self.requires,
            ensures: self.ensures.clone(),
        }
    }
}

/// Ordered association of operations to contracts, plus invariants
#[derive(Debug)]
pub struct ContractRegistry<K, V> {
    invariants: Vec<Invariant<K, V>>,
    contracts: IndexMap<Operation, Contract<K, V>>,
    entry_invariants: Vec<EntryPredicate<K, V>>,
    entry_postconditions: Vec<EntryPredicate<K, V>>,
}

impl<K, V> Clone for ContractRegistry<K, V> {
    fn clone(&self) -> Self {
        Self {
            invariants: self.invariants.clone(),
            contracts: self.contracts.clone(),
            entry_invariants: self.entry_invariants.clone(),
            entry_postconditions: self.entry_postconditions.clone(),
        }
    }
}

impl<K: MapKey, V: MapItem> ContractRegistry<K, V> {
    /// The full map contract
    pub fn standard() -> Self {
        let contracts = Operation::ALL
            .iter()
            .map(|&op| {
                let contract = Contract {
                    requires: requirements(op),
                    ensures: predicates::postconditions(op),
                };
                (op, contract)
            })
            .collect();

        Self {
            invariants: predicates::invariants(),
            contracts,
            entry_invariants: predicates::entry_invariants(),
            entry_postconditions: predicates::entry_postconditions(),
        }
    }

    /// Append a store-specific invariant
    pub fn with_invariant(mut self, name: &'static str, check: InvariantFn<K, V>) -> Self {
        self.invariants.push(Invariant::new(name, check));
        self
    }

    /// Append a postcondition to `op`
    pub fn with_postcondition(mut self, op: Operation, name: &'static str, check: PostconditionFn<K, V>) -> Self {
        if let Some(contract) = self.contracts.get_mut(&op) {
            contract.ensures.push(Postcondition::new(name, check));
        }
        self
    }
}

impl<K, V> ContractRegistry<K, V> {
    pub fn invariants(&self) -> &[Invariant<K, V>] {
        &self.invariants
    }

    pub fn contract(&self, op: Operation) -> Option<&Contract<K, V>> {
        self.contracts.get(&op)
    }

    pub fn requirements(&self, op: Operation) -> &'static [Requirement] {
        match self.contract(op) {
            Some(contract) => contract.requires,
            None => &[],
        }
    }

    pub fn postconditions(&self, op: Operation) -> &[Postcondition<K, V>] {
        match self.contract(op) {
            Some(contract) => &contract.ensures,
            None => &[],
        }
    }

    pub fn entry_invariants(&self) -> &[EntryPredicate<K, V>] {
        &self.entry_invariants
    }

    pub fn entry_postconditions(&self) -> &[EntryPredicate<K, V>] {
        &self.entry_postconditions
    }

    /// Names of every predicate, by operation
    pub fn catalog(&self) -> Catalog {
        let operations = self
            .contracts
            .iter()
            .map(|(&operation, contract)| OperationContract {
                operation,
                requires: contract.requires.to_vec(),
                ensures: names(contract.ensures.iter().filter(|p| !p.on_error).map(|p| p.name)),
                ensures_on_error: names(contract.ensures.iter().filter(|p| p.on_error).map(|p| p.name)),
            })
            .collect();

        Catalog {
            invariants: names(self.invariants.iter().map(|i| i.name)),
            entry_invariants: names(self.entry_invariants.iter().map(|p| p.name)),
            entry_postconditions: names(self.entry_postconditions.iter().map(|p| p.name)),
            operations,
        }
    }
}

fn names<'a>(iter: impl Iterator<Item = &'a str>) -> Vec<String> {
    iter.map(str::to_string).collect()
}

/// Serializable listing of a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub invariants: Vec<String>,
    pub entry_invariants: Vec<String>,
    pub entry_postconditions: Vec<String>,
    pub operations: Vec<OperationContract>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContract {
    pub operation: Operation,
    pub requires: Vec<Requirement>,
    pub ensures: Vec<String>,
    pub ensures_on_error: Vec<String>,
}

impl Catalog {
    pub fn operation(&self, op: Operation) -> Option<&OperationContract> {
        self.operations.iter().find(|c| c.operation == op)
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invariants: {}", self.invariants.join(", "))?;
        writeln!(f, "entry invariants: {}", self.entry_invariants.join(", "))?;
        writeln!(f, "entry postconditions: {}", self.entry_postconditions.join(", "))?;
        for contract in &self.operations {
            writeln!(f)?;
            writeln!(f, "{}", contract.operation)?;
            if !contract.requires.is_empty() {
                let requires: Vec<_> = contract.requires.iter().map(|r| r.as_str()).collect();
                writeln!(f, "  requires: {}", requires.join(", "))?;
            }
            if !contract.ensures.is_empty() {
                writeln!(f, "  ensures: {}", contract.ensures.join(", "))?;
            }
            if !contract.ensures_on_error.is_empty() {
                writeln!(f, "  ensures on error: {}", contract.ensures_on_error.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_every_operation_registered_in_order() {
        let registry = ContractRegistry::<String, i32>::standard();
        let catalog = registry.catalog();
        let ops: Vec<_> = catalog.operations.iter().map(|c| c.operation).collect();
        assert_eq!(ops, Operation::ALL.to_vec());
    }

    #[test]
    fn test_put_contract() {
        let registry = ContractRegistry::<String, i32>::standard();
        assert_eq!(
            registry.requirements(Operation::Put),
            &[
                Requirement::PutSupported,
                Requirement::KeyNullPolicy,
                Requirement::ValueNullPolicy,
                Requirement::KeyType,
                Requirement::ValueType,
            ]
        );
        let names: Vec<_> = registry.postconditions(Operation::Put).iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["contains_entry", "size_increases_iff_key_absent", "returns_old_value", "other_entries_unchanged"]
        );
    }

    #[test]
    fn test_compute_family_checks_state_on_error() {
        let catalog = ContractRegistry::<Value, Value>::standard().catalog();
        for op in [
            Operation::ComputeIfAbsent,
            Operation::ComputeIfPresent,
            Operation::Compute,
            Operation::Merge,
            Operation::ReplaceAll,
        ] {
            let contract = catalog.operation(op).unwrap();
            assert_eq!(contract.ensures_on_error, vec!["unchanged_on_error".to_string()], "{op}");
        }
    }

    #[test]
    fn test_invariants_listed() {
        let catalog = ContractRegistry::<u8, u8>::standard().catalog();
        assert_eq!(
            catalog.invariants,
            vec!["size_matches_entry_count", "empty_iff_size_zero", "hash_code_is_valid", "null_policy_respected"]
        );
        assert_eq!(catalog.entry_invariants, vec!["entry_hash_is_valid"]);
        assert_eq!(catalog.entry_postconditions, vec!["has_value", "returns_old_value"]);
    }

    #[test]
    fn test_with_invariant_appends() {
        fn at_most_two(view: &dyn MapView<u8, u8>) -> bool {
            view.len() <= 2
        }
        let registry = ContractRegistry::<u8, u8>::standard().with_invariant("at_most_two", at_most_two);
        assert_eq!(registry.invariants().last().map(|i| i.name), Some("at_most_two"));
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let catalog = ContractRegistry::<u8, u8>::standard().catalog();
        let json = serde_json::to_string_pretty(&catalog).unwrap();
        assert!(json.contains("\"put_if_absent\""));
        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_catalog_display() {
        let text = ContractRegistry::<u8, u8>::standard().catalog().to_string();
        assert!(text.contains("clear\n  requires: clear_supported\n  ensures: is_empty"));
    }

    #[test]
    fn test_type_witness_skips_nulls() {
        let snapshot = Snapshot::from_entries(
            [(Value::Null, Value::Null), (Value::from("k"), Value::Int(1))],
            crate::view::Capabilities::all(),
        );
        let witness = TypeWitness::of(&snapshot);
        assert_eq!(witness.key, Some("str"));
        assert_eq!(witness.value, Some("int"));
    }
}
