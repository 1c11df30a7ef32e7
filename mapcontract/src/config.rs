//! Verification configuration
//!
//! Precondition checks always run: they define the error surface of a map.
//! `VerificationMode` only switches the snapshot, invariant and postcondition
//! machinery, so a disabled map is a pass-through with identical results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable read by [`VerifyConfig::from_env`]
pub const VERIFY_ENV: &str = "MAPCONTRACT_VERIFY";

/// Whether invariants and postconditions are evaluated
///
/// - `Disabled`: no snapshot is taken and no predicate runs (release default)
/// - `Enforced`: every call is checked, failures raise a contract violation (debug default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    Disabled,
    Enforced,
}

impl VerificationMode {
    pub fn is_enforced(self) -> bool {
        self == VerificationMode::Enforced
    }
}

impl Default for VerificationMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            VerificationMode::Enforced
        } else {
            VerificationMode::Disabled
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::Disabled => write!(f, "disabled"),
            VerificationMode::Enforced => write!(f, "enforced"),
        }
    }
}

impl FromStr for VerificationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "off" | "false" | "disabled" => Ok(VerificationMode::Disabled),
            "1" | "on" | "true" | "enforced" => Ok(VerificationMode::Enforced),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid verification mode `{0}` (expected enforced/disabled, on/off or 1/0)")]
    InvalidMode(String),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Verification configuration of a verified map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Verification mode
    pub mode: VerificationMode,
    /// Also evaluate container invariants against the state before each call
    pub check_invariants_on_entry: bool,
    /// Emit a debug event for every predicate that holds
    pub log_passing_checks: bool,
}

impl VerifyConfig {
    /// Create a configuration with defaults for the current build profile
    pub fn new() -> Self {
        Self {
            mode: VerificationMode::default(),
            check_invariants_on_entry: true,
            log_passing_checks: false,
        }
    }

    /// Every check enabled, whatever the build profile
    pub fn enforced() -> Self {
        Self::new().mode(VerificationMode::Enforced)
    }

    /// Pass-through: preconditions only
    pub fn disabled() -> Self {
        Self::new().mode(VerificationMode::Disabled)
    }

    /// Set verification mode
    pub fn mode(mut self, mode: VerificationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set whether invariants are checked before the call as well as after
    pub fn check_invariants_on_entry(mut self, enable: bool) -> Self {
        self.check_invariants_on_entry = enable;
        self
    }

    /// Set whether passing predicates are logged
    pub fn log_passing_checks(mut self, enable: bool) -> Self {
        self.log_passing_checks = enable;
        self
    }

    pub fn is_enforced(&self) -> bool {
        self.mode.is_enforced()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Defaults, with the mode overridden by `MAPCONTRACT_VERIFY` when set
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(VERIFY_ENV) {
            Ok(value) => Ok(Self::new().mode(value.parse()?)),
            Err(_) => Ok(Self::new()),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters kept by a verified map; they never influence outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStats {
    /// Verified calls, including ones rejected by a precondition
    pub calls: u64,
    /// Calls rejected with a caller error
    pub caller_errors: u64,
    /// Invariants, postconditions and entry predicates evaluated
    pub predicates_evaluated: u64,
    /// Predicates that evaluated to false
    pub violations: u64,
    /// Predicates that panicked
    pub predicate_failures: u64,
}

impl VerificationStats {
    pub fn merge(&mut self, other: &VerificationStats) {
        self.calls += other.calls;
        self.caller_errors += other.caller_errors;
        self.predicates_evaluated += other.predicates_evaluated;
        self.violations += other.violations;
        self.predicate_failures += other.predicate_failures;
    }
}

impl fmt::Display for VerificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} calls, {} caller errors, {} predicates evaluated, {} violations, {} predicate failures",
            self.calls, self.caller_errors, self.predicates_evaluated, self.violations, self.predicate_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("off".parse::<VerificationMode>().unwrap(), VerificationMode::Disabled);
        assert_eq!("0".parse::<VerificationMode>().unwrap(), VerificationMode::Disabled);
        assert_eq!(" Enforced ".parse::<VerificationMode>().unwrap(), VerificationMode::Enforced);
        assert_eq!("on".parse::<VerificationMode>().unwrap(), VerificationMode::Enforced);
        assert!("sometimes".parse::<VerificationMode>().is_err());
    }

    #[test]
    fn test_default_follows_build_profile() {
        assert_eq!(VerificationMode::default().is_enforced(), cfg!(debug_assertions));
    }

    #[test]
    fn test_builders() {
        let config = VerifyConfig::enforced()
            .check_invariants_on_entry(false)
            .log_passing_checks(true);
        assert!(config.is_enforced());
        assert!(!config.check_invariants_on_entry);
        assert!(config.log_passing_checks);
        assert!(!VerifyConfig::disabled().is_enforced());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = VerifyConfig::from_toml_str("mode = \"disabled\"").unwrap();
        assert_eq!(config.mode, VerificationMode::Disabled);
        assert!(config.check_invariants_on_entry);
        assert!(!config.log_passing_checks);
    }

    #[test]
    fn test_from_toml_rejects_unknown_mode() {
        let err = VerifyConfig::from_toml_str("mode = \"lenient\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_stats_display_and_merge() {
        let mut a = VerificationStats {
            calls: 2,
            predicates_evaluated: 10,
            ..Default::default()
        };
        a.merge(&VerificationStats {
            calls: 1,
            violations: 1,
            ..Default::default()
        });
        assert_eq!(a.calls, 3);
        insta::assert_snapshot!(
            a.to_string(),
            @"3 calls, 0 caller errors, 10 predicates evaluated, 1 violations, 0 predicate failures"
        );
    }
}
