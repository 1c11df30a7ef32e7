//! Reference scenarios
//!
//! Short call sequences with known results, run by the `scenarios` command
//! and by the integration tests. Each scenario builds its own map from the
//! given configuration.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::VerifyConfig;
use crate::error::{ErrorKind, MapError};
use crate::store::HashStore;
use crate::value::Value;
use crate::verified::VerifiedMap;
use crate::view::Capabilities;

/// Why a scenario failed
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("{what}: expected {expected}, got {actual}")]
    Expectation {
        what: String,
        expected: String,
        actual: String,
    },
}

type Outcome = Result<(), ScenarioError>;

fn expect<T: PartialEq + fmt::Debug>(what: &str, actual: T, expected: T) -> Outcome {
    if actual == expected {
        return Ok(());
    }
    Err(ScenarioError::Expectation {
        what: what.to_string(),
        expected: format!("{expected:?}"),
        actual: format!("{actual:?}"),
    })
}

fn expect_error<T: fmt::Debug>(what: &str, result: crate::Result<T>, kind: ErrorKind) -> Outcome {
    match result {
        Err(err) if err.kind() == kind => Ok(()),
        Err(err) => Err(err.into()),
        Ok(value) => Err(ScenarioError::Expectation {
            what: what.to_string(),
            expected: format!("{kind:?} error"),
            actual: format!("Ok({value:?})"),
        }),
    }
}

/// A named reference scenario
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: fn(VerifyConfig) -> Outcome,
}

impl Scenario {
    pub fn run(&self, config: VerifyConfig) -> ScenarioReport {
        let error = (self.run)(config).err().map(|e| e.to_string());
        ScenarioReport {
            name: self.name,
            description: self.description,
            passed: error.is_none(),
            error,
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub description: &'static str,
    pub passed: bool,
    pub error: Option<String>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "✓ {}: {}", self.name, self.description),
            Some(error) => write!(f, "✗ {}: {} ({error})", self.name, self.description),
        }
    }
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "A",
        description: "overwriting a key keeps the size and replaces the value",
        run: overwrite_keeps_size,
    },
    Scenario {
        name: "B",
        description: "removing keys shrinks the map until it is empty",
        run: remove_until_empty,
    },
    Scenario {
        name: "C",
        description: "null keys are rejected or stored according to capabilities",
        run: null_policy,
    },
    Scenario {
        name: "D",
        description: "put_if_absent only stores into an absent key",
        run: put_if_absent_once,
    },
    Scenario {
        name: "E",
        description: "remove_entry only removes a matching entry",
        run: remove_matching_entry,
    },
];

/// Run every scenario
pub fn run_all(config: VerifyConfig) -> Vec<ScenarioReport> {
    SCENARIOS.iter().map(|s| s.run(config)).collect()
}

fn map<K: crate::MapKey, V: crate::MapItem>(config: VerifyConfig, capabilities: Capabilities) -> VerifiedMap<K, V> {
    VerifiedMap::with_config(HashStore::with_capabilities(capabilities), config)
}

fn overwrite_keeps_size(config: VerifyConfig) -> Outcome {
    let mut m = map::<String, i32>(config, Capabilities::all());
    m.put("one".to_string(), 1)?;
    m.put("two".to_string(), 2)?;
    m.put("three".to_string(), 3)?;
    expect("size after three puts", m.len()?, 3)?;

    m.put("three".to_string(), 4)?;
    expect("size after overwrite", m.len()?, 3)?;
    expect("overwritten value", m.get(&"three".to_string())?, Some(4))
}

fn remove_until_empty(config: VerifyConfig) -> Outcome {
    let mut m = map::<i32, String>(config, Capabilities::all());
    m.put(1, "Jan".to_string())?;
    m.put(2, "Feb".to_string())?;

    m.remove(&1)?;
    expect("contains removed key", m.contains_key(&1)?, false)?;
    expect("size after first remove", m.len()?, 1)?;

    expect("second remove", m.remove(&2)?, Some("Feb".to_string()))?;
    expect("empty after second remove", m.is_empty()?, true)?;
    expect("repeated remove", m.remove(&2)?, None)
}

fn null_policy(config: VerifyConfig) -> Outcome {
    let strict = map::<Value, Value>(config, Capabilities::all().without_null_items());
    expect_error("get(null) without null support", strict.get(&Value::Null), ErrorKind::NullKey)?;

    let mut lenient = map::<Value, Value>(config, Capabilities::all());
    lenient.put(Value::from("k"), Value::Null)?;
    expect("contains key mapped to null", lenient.contains_key(&Value::from("k"))?, true)
}

fn put_if_absent_once(config: VerifyConfig) -> Outcome {
    let mut m = map::<&'static str, i32>(config, Capabilities::all());
    expect("first put_if_absent", m.put_if_absent("three", 3)?, None)?;
    expect("value after first put_if_absent", m.get(&"three")?, Some(3))?;

    expect("second put_if_absent", m.put_if_absent("three", 4)?, Some(3))?;
    expect("value after second put_if_absent", m.get(&"three")?, Some(3))
}

fn remove_matching_entry(config: VerifyConfig) -> Outcome {
    let mut m = map::<&'static str, i32>(config, Capabilities::all());
    m.put("three", 4)?;
    expect("remove matching entry", m.remove_entry(&"three", &4)?, true)?;

    let size = m.len()?;
    expect("remove it again", m.remove_entry(&"three", &4)?, false)?;
    expect("size after failed remove", m.len()?, size)
}
