//! mapcontract
//!
//! Contract verification for map-like containers. A [`VerifiedMap`] wraps a
//! backing store and checks container invariants, operation preconditions and
//! postconditions (over the state before and after each call) on every public
//! operation.

pub mod config;
pub mod contract;
pub mod error;
pub mod item;
pub mod scenario;
pub mod snapshot;
pub mod store;
pub mod value;
pub mod verified;
pub mod view;

pub use config::{VerificationMode, VerificationStats, VerifyConfig};
pub use contract::{Catalog, ContractRegistry, Operation, Requirement};
pub use error::{ErrorKind, MapError, PredicateKind, Result, Violation};
pub use item::{MapItem, MapKey};
pub use snapshot::Snapshot;
pub use store::{HashStore, SharedStore};
pub use value::Value;
pub use verified::{EntryMut, VerifiedMap};
pub use view::{BackingStore, Capabilities, MapView};
