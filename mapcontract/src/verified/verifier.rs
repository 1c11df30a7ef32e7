//! Per-call verification steps
//!
//! A verified call runs as `enter` (preconditions, snapshot, entry
//! invariants), the delegated store call, then `exit` (invariants and
//! postconditions against the recorded outcome). When verification is
//! disabled `enter` only checks preconditions and `exit` returns the result
//! untouched.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace};

use crate::config::{VerificationStats, VerifyConfig};
use crate::contract::{Args, Check, ContractRegistry, EntryCheck, Operation, Outcome, Requirement, TypeWitness};
use crate::error::{MapError, PredicateKind, Result, Violation};
use crate::item::{MapItem, MapKey};
use crate::snapshot::Snapshot;
use crate::view::{Capabilities, MapView};

/// State carried from `enter` to `exit` of one verified call
pub(crate) struct Pending<K, V> {
    op: Operation,
    old: Snapshot<K, V>,
    args: Args<K, V>,
}

/// Write access to the arguments of an in-flight call
///
/// Inert when verification is disabled.
pub(crate) struct Recorder<'a, K, V> {
    args: Option<&'a mut Args<K, V>>,
}

impl<'a, K: Clone, V: Clone> Recorder<'a, K, V> {
    pub(crate) fn of(pending: &'a mut Option<Pending<K, V>>) -> Self {
        Self {
            args: pending.as_mut().map(|p| &mut p.args),
        }
    }

    /// Record the result of the caller's function
    pub(crate) fn produced(&mut self, value: &Option<V>) {
        if let Some(args) = self.args.as_deref_mut() {
            args.produced = Some(value.clone());
        }
    }

    pub(crate) fn pair(&mut self, key: &K, value: &V) {
        if let Some(args) = self.args.as_deref_mut() {
            args.pairs.push((key.clone(), value.clone()));
        }
    }
}

/// Evaluates a contract registry around store calls
pub struct Verifier<K, V> {
    registry: ContractRegistry<K, V>,
    config: VerifyConfig,
    stats: Cell<VerificationStats>,
}

impl<K: MapKey, V: MapItem> Verifier<K, V> {
    pub fn new(registry: ContractRegistry<K, V>, config: VerifyConfig) -> Self {
        Self {
            registry,
            config,
            stats: Cell::new(VerificationStats::default()),
        }
    }

    pub fn registry(&self) -> &ContractRegistry<K, V> {
        &self.registry
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub fn stats(&self) -> VerificationStats {
        self.stats.get()
    }

    pub fn is_enforced(&self) -> bool {
        self.config.is_enforced()
    }

    fn bump(&self, update: impl FnOnce(&mut VerificationStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Check the preconditions of `op`; nothing is snapshotted or mutated
    pub(crate) fn require(
        &self,
        op: Operation,
        capabilities: Capabilities,
        keys: &[&K],
        values: &[&V],
        witness: impl FnOnce() -> TypeWitness,
    ) -> Result<()> {
        self.bump(|s| s.calls += 1);

        let requirements = self.registry.requirements(op);
        let typed = keys.iter().any(|k| k.type_tag().is_some()) || values.iter().any(|v| v.type_tag().is_some());
        let witness = if typed
            && requirements
                .iter()
                .any(|r| matches!(r, Requirement::KeyType | Requirement::ValueType))
        {
            witness()
        } else {
            TypeWitness::default()
        };

        for requirement in requirements {
            if let Some(err) = violated(op, *requirement, capabilities, keys, values, witness) {
                self.bump(|s| s.caller_errors += 1);
                trace!(operation = %op, requirement = requirement.as_str(), "precondition rejected call");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Preconditions, then snapshot and entry invariants when enforced
    pub(crate) fn enter(
        &self,
        store: &dyn MapView<K, V>,
        op: Operation,
        keys: &[&K],
        values: &[&V],
        args: impl FnOnce() -> Args<K, V>,
    ) -> Result<Option<Pending<K, V>>> {
        self.require(op, store.capabilities(), keys, values, || TypeWitness::of(store))?;

        if !self.is_enforced() {
            return Ok(None);
        }
        trace!(operation = %op, size = store.len(), "verifying call");

        if self.config.check_invariants_on_entry {
            self.check_invariants(op, store, PredicateKind::InvariantOnEntry)?;
        }
        Ok(Some(Pending {
            op,
            old: Snapshot::capture(store),
            args: args(),
        }))
    }

    /// Invariants and postconditions of a completed call
    ///
    /// A failed call is checked against the postconditions that describe the
    /// state after an error; the call's own error is returned if they hold.
    pub(crate) fn exit<T>(
        &self,
        store: &dyn MapView<K, V>,
        pending: Option<Pending<K, V>>,
        result: Result<T>,
        outcome: impl FnOnce(&T) -> Outcome<K, V>,
    ) -> Result<T> {
        let Some(pending) = pending else {
            return result;
        };
        let op = pending.op;
        let outcome = match &result {
            Ok(value) => outcome(value),
            Err(_) => Outcome::Failed,
        };

        self.check_invariants(op, store, PredicateKind::Invariant)?;

        let check = Check {
            old: &pending.old,
            new: store,
            args: &pending.args,
            outcome: &outcome,
        };
        let failed = outcome.is_failed();
        for postcondition in self.registry.postconditions(op).iter().filter(|p| p.on_error == failed) {
            self.evaluate(op, postcondition.name, PredicateKind::Postcondition, || {
                (postcondition.check)(&check)
            })?;
        }
        result
    }

    fn check_invariants(&self, op: Operation, store: &dyn MapView<K, V>, kind: PredicateKind) -> Result<()> {
        for invariant in self.registry.invariants() {
            self.evaluate(op, invariant.name, kind, || (invariant.check)(store))?;
        }
        Ok(())
    }

    /// Entry invariants of one traversal step; `stored` is the store's own
    /// answer for `key`
    pub(crate) fn check_entry(&self, key: &K, value: &V, hash: u64, stored: Option<&V>) -> Result<()> {
        if !self.is_enforced() {
            return Ok(());
        }
        let check = EntryCheck {
            key,
            value,
            hash,
            stored,
            argument: None,
            old_value: None,
            returned: None,
        };
        for predicate in self.registry.entry_invariants() {
            self.evaluate(Operation::VisitEntries, predicate.name, PredicateKind::EntryInvariant, || {
                (predicate.check)(&check)
            })?;
        }
        Ok(())
    }

    /// Postconditions of an entry write
    pub(crate) fn check_set_value(&self, check: &EntryCheck<'_, K, V>) -> Result<()> {
        for predicate in self.registry.entry_postconditions() {
            self.evaluate(Operation::EntrySetValue, predicate.name, PredicateKind::EntryPostcondition, || {
                (predicate.check)(check)
            })?;
        }
        Ok(())
    }

    fn evaluate(&self, op: Operation, name: &str, kind: PredicateKind, check: impl FnOnce() -> bool) -> Result<()> {
        self.bump(|s| s.predicates_evaluated += 1);

        match panic::catch_unwind(AssertUnwindSafe(check)) {
            Ok(true) => {
                if self.config.log_passing_checks {
                    debug!(operation = %op, predicate = name, %kind, "predicate holds");
                }
                Ok(())
            }
            Ok(false) => {
                self.bump(|s| s.violations += 1);
                let violation = Violation::new(op, name, kind);
                error!(operation = %op, predicate = name, %kind, "{violation}");
                Err(MapError::ContractViolation(violation))
            }
            Err(payload) => {
                self.bump(|s| s.predicate_failures += 1);
                let message = panic_message(&*payload);
                error!(operation = %op, predicate = name, %kind, "predicate panicked: {message}");
                Err(MapError::PredicateFailure {
                    operation: op,
                    predicate: name.to_string(),
                    message,
                })
            }
        }
    }
}

fn violated<K: MapKey, V: MapItem>(
    op: Operation,
    requirement: Requirement,
    capabilities: Capabilities,
    keys: &[&K],
    values: &[&V],
    witness: TypeWitness,
) -> Option<MapError> {
    let null_key = || keys.iter().any(|k| k.is_null());
    let null_value = || values.iter().any(|v| v.is_null());

    match requirement {
        Requirement::PutSupported => (!capabilities.put).then(|| MapError::unsupported(op)),
        Requirement::RemoveSupported => (!capabilities.remove).then(|| MapError::unsupported(op)),
        Requirement::ClearSupported => (!capabilities.clear).then(|| MapError::unsupported(op)),
        Requirement::KeyNullPolicy => (!capabilities.null_items && null_key()).then(|| MapError::null_key(op)),
        Requirement::ValueNullPolicy => {
            (!capabilities.null_items && null_value()).then(|| MapError::null_value(op))
        }
        Requirement::ValueNotNull => null_value().then(|| MapError::null_value(op)),
        Requirement::KeyType => {
            let (expected, found) = mismatch(witness.key, keys.iter().map(|k| k.type_tag()))?;
            Some(MapError::wrong_key_type(op, expected, found))
        }
        Requirement::ValueType => {
            let (expected, found) = mismatch(witness.value, values.iter().map(|v| v.type_tag()))?;
            Some(MapError::wrong_value_type(op, expected, found))
        }
    }
}

/// First tag that differs from the established one
///
/// Without an established type the first tagged argument sets it, so one
/// call cannot bring in items of several types.
fn mismatch(
    established: Option<&'static str>,
    tags: impl Iterator<Item = Option<&'static str>>,
) -> Option<(&'static str, &'static str)> {
    let mut expected = established;
    for tag in tags.flatten() {
        match expected {
            None => expected = Some(tag),
            Some(e) if e != tag => return Some((e, tag)),
            Some(_) => {}
        }
    }
    None
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
