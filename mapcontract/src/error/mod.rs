//! Error types for verified map operations

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::Operation;

/// Result type alias
pub type Result<T> = std::result::Result<T, MapError>;

/// Error raised by a caller-supplied closure (compute, merge, replace_all)
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error returned by every operation of a verified map
#[derive(Debug, Error)]
pub enum MapError {
    #[error("null key passed to `{operation}` on a map without null support")]
    NullKey { operation: Operation },

    #[error("null value passed to `{operation}` on a map without null support")]
    NullValue { operation: Operation },

    #[error("wrong key type in `{operation}`: expected {expected}, got {found}")]
    WrongKeyType {
        operation: Operation,
        expected: String,
        found: String,
    },

    #[error("wrong value type in `{operation}`: expected {expected}, got {found}")]
    WrongValueType {
        operation: Operation,
        expected: String,
        found: String,
    },

    #[error("`{operation}` is not supported by this map")]
    Unsupported { operation: Operation },

    /// An invariant or postcondition evaluated to false
    #[error("{0}")]
    ContractViolation(Violation),

    /// A predicate panicked instead of answering
    #[error("predicate `{predicate}` of `{operation}` failed to evaluate: {message}")]
    PredicateFailure {
        operation: Operation,
        predicate: String,
        message: String,
    },

    /// Error returned by a caller-supplied closure, passed through untouched
    #[error("callback passed to `{operation}` failed: {source}")]
    Callback {
        operation: Operation,
        #[source]
        source: CallbackError,
    },
}

/// Stable discriminant of [`MapError`] for matching in tests and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NullKey,
    NullValue,
    WrongKeyType,
    WrongValueType,
    Unsupported,
    ContractViolation,
    PredicateFailure,
    Callback,
}

impl MapError {
    pub fn null_key(operation: Operation) -> Self {
        Self::NullKey { operation }
    }

    pub fn null_value(operation: Operation) -> Self {
        Self::NullValue { operation }
    }

    pub fn wrong_key_type(operation: Operation, expected: &str, found: &str) -> Self {
        Self::WrongKeyType {
            operation,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn wrong_value_type(operation: Operation, expected: &str, found: &str) -> Self {
        Self::WrongValueType {
            operation,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn unsupported(operation: Operation) -> Self {
        Self::Unsupported { operation }
    }

    pub fn callback(operation: Operation, source: impl Into<CallbackError>) -> Self {
        Self::Callback {
            operation,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NullKey { .. } => ErrorKind::NullKey,
            Self::NullValue { .. } => ErrorKind::NullValue,
            Self::WrongKeyType { .. } => ErrorKind::WrongKeyType,
            Self::WrongValueType { .. } => ErrorKind::WrongValueType,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::ContractViolation(_) => ErrorKind::ContractViolation,
            Self::PredicateFailure { .. } => ErrorKind::PredicateFailure,
            Self::Callback { .. } => ErrorKind::Callback,
        }
    }

    /// The operation that raised this error
    pub fn operation(&self) -> Operation {
        match self {
            Self::NullKey { operation }
            | Self::NullValue { operation }
            | Self::WrongKeyType { operation, .. }
            | Self::WrongValueType { operation, .. }
            | Self::Unsupported { operation }
            | Self::PredicateFailure { operation, .. }
            | Self::Callback { operation, .. } => *operation,
            Self::ContractViolation(violation) => violation.operation,
        }
    }

    /// Caller errors are documented precondition failures, raised before any mutation
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NullKey { .. }
                | Self::NullValue { .. }
                | Self::WrongKeyType { .. }
                | Self::WrongValueType { .. }
                | Self::Unsupported { .. }
        )
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Self::ContractViolation(violation) => Some(violation),
            _ => None,
        }
    }

    /// Recover the closure error of a [`MapError::Callback`]
    pub fn into_callback_error(self) -> Option<CallbackError> {
        match self {
            Self::Callback { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Borrow the closure error as its concrete type
    pub fn callback_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Callback { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Where a failing predicate was evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    /// Container invariant checked against the state before the call
    InvariantOnEntry,
    /// Container invariant checked against the state after the call
    Invariant,
    /// Operation postcondition
    Postcondition,
    /// Invariant of a single entry during traversal
    EntryInvariant,
    /// Postcondition of an entry write
    EntryPostcondition,
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvariantOnEntry => "invariant (on entry)",
            Self::Invariant => "invariant",
            Self::Postcondition => "postcondition",
            Self::EntryInvariant => "entry invariant",
            Self::EntryPostcondition => "entry postcondition",
        };
        f.write_str(text)
    }
}

/// A falsified invariant or postcondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub operation: Operation,
    pub predicate: String,
    pub kind: PredicateKind,
}

impl Violation {
    pub fn new(operation: Operation, predicate: &str, kind: PredicateKind) -> Self {
        Self {
            operation,
            predicate: predicate.to_string(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "contract violation in `{}`: {} `{}` does not hold",
            self.operation, self.kind, self.predicate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_violation_display() {
        let err = MapError::ContractViolation(Violation::new(
            Operation::Remove,
            "returns_old_value",
            PredicateKind::Postcondition,
        ));
        insta::assert_snapshot!(
            err.to_string(),
            @"contract violation in `remove`: postcondition `returns_old_value` does not hold"
        );
    }

    #[test]
    fn test_caller_error_display() {
        insta::assert_snapshot!(
            MapError::null_key(Operation::Get).to_string(),
            @"null key passed to `get` on a map without null support"
        );
        insta::assert_snapshot!(
            MapError::wrong_key_type(Operation::Put, "str", "int").to_string(),
            @"wrong key type in `put`: expected str, got int"
        );
    }

    #[test]
    fn test_error_kind_and_operation() {
        let err = MapError::unsupported(Operation::Clear);
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.operation(), Operation::Clear);
        assert!(err.is_caller_error());
        assert!(err.violation().is_none());
    }

    #[test]
    fn test_violation_is_not_caller_error() {
        let err = MapError::ContractViolation(Violation::new(
            Operation::Put,
            "contains_entry",
            PredicateKind::Postcondition,
        ));
        assert!(!err.is_caller_error());
        assert_eq!(err.violation().map(|v| v.predicate.as_str()), Some("contains_entry"));
    }

    #[test]
    fn test_callback_error_downcast() {
        let err = MapError::callback(Operation::Compute, Boom);
        assert_eq!(err.kind(), ErrorKind::Callback);
        assert!(err.callback_error::<Boom>().is_some());
        assert_eq!(err.into_callback_error().map(|e| e.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_violation_serde() {
        let violation = Violation::new(Operation::PutAll, "contains_all_entries", PredicateKind::Postcondition);
        let json = serde_json::to_string(&violation).unwrap();
        assert!(json.contains("\"put_all\""));
        let back: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, violation);
    }
}
