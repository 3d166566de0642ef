//! Processor errors

use taxograph_core::{GraphError, Issue};
use taxograph_store::StoreError;
use thiserror::Error;

/// Why a change set was rejected.
#[derive(Debug, Error)]
pub enum ChangeError {
    /// Referenced parents or ancestors are not in storage.
    #[error("missing referenced concepts: {}", .0.join(", "))]
    MissingReferences(Vec<String>),
    /// The rebuilt local hierarchy reported structural issues. `dropped`
    /// counts issues that fell out of the report window.
    #[error("inconsistent taxonomy after applying changes: {}", describe(.issues, .dropped))]
    InconsistentGraph { issues: Vec<Issue>, dropped: usize },
    #[error("ancestor lookup did not settle after {0} rounds")]
    LookupLimitExceeded(usize),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChangeError {
    /// The change set itself is invalid.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ChangeError::MissingReferences(_))
    }

    /// The persisted hierarchy and the change set cannot be reconciled.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            ChangeError::InconsistentGraph { .. } | ChangeError::LookupLimitExceeded(_) | ChangeError::Graph(_)
        )
    }
}

fn describe(issues: &[Issue], dropped: &usize) -> String {
    let mut parts: Vec<String> = issues.iter().map(ToString::to_string).collect();
    if *dropped > 0 {
        parts.push(format!("{} more not reported", dropped));
    }
    parts.join("; ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
