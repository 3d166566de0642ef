//! Processor configuration

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use taxograph_core::{CycleCheck, DEFAULT_ISSUE_CAPACITY};

use crate::error::ConfigError;

pub const DEFAULT_MAX_LOOKUP_ROUNDS: usize = 32;

pub const ENV_MAX_LOOKUP_ROUNDS: &str = "TAXOGRAPH_MAX_LOOKUP_ROUNDS";
pub const ENV_CYCLE_CHECK: &str = "TAXOGRAPH_CYCLE_CHECK";
pub const ENV_ISSUE_CAPACITY: &str = "TAXOGRAPH_ISSUE_CAPACITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Upper bound on ancestor lookup rounds per change set
    pub max_lookup_rounds: usize,
    pub cycle_check: CycleCheck,
    /// Issue window of every graph the processor builds
    pub issue_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            max_lookup_rounds: DEFAULT_MAX_LOOKUP_ROUNDS,
            cycle_check: CycleCheck::default(),
            issue_capacity: DEFAULT_ISSUE_CAPACITY,
        }
    }
}

impl ProcessorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source.
    pub fn apply_env_with(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = var(ENV_MAX_LOOKUP_ROUNDS) {
            self.max_lookup_rounds = parse_env(ENV_MAX_LOOKUP_ROUNDS, &value)?;
        }
        if let Some(value) = var(ENV_CYCLE_CHECK) {
            self.cycle_check = parse_env(ENV_CYCLE_CHECK, &value)?;
        }
        if let Some(value) = var(ENV_ISSUE_CAPACITY) {
            self.issue_capacity = parse_env(ENV_ISSUE_CAPACITY, &value)?;
        }
        Ok(self)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
