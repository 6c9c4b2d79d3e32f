//! Error taxonomy shared by the gateway crates.

use crate::manifest::ParseWarning;
use thiserror::Error;

/// Startup configuration failure. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} must start with http:// or https://, got {value:?}")]
    InvalidScheme { var: &'static str, value: String },

    #[error("{var} is not a valid URL ({value:?}): {reason}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{var} must be an integer, got {value:?}")]
    NotAnInteger { var: &'static str, value: String },

    #[error("{var} must be between {min} and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: String,
        min: u64,
        max: u64,
    },
}

/// Malformed tool input. Reported to the peer, never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("requirements_text must be a non-empty string")]
    EmptyRequirements,

    #[error("no valid dependencies found in requirements_text ({} line(s) skipped)", .warnings.len())]
    NoValidDependencies { warnings: Vec<ParseWarning> },

    #[error("Project name must be between 1 and {max} characters (got {length})")]
    InvalidProjectName { length: usize, max: usize },

    #[error("user_token {0}")]
    InvalidToken(&'static str),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

impl ValidationError {
    /// Stable error code reported to MCP peers.
    pub fn code(&self) -> &'static str {
        "VALIDATION_ERROR"
    }

    /// Human-readable message, including the skipped lines when nothing parsed.
    pub fn describe(&self) -> String {
        match self {
            Self::NoValidDependencies { warnings } if !warnings.is_empty() => {
                let details = warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{}: {}", self, details)
            }
            _ => self.to_string(),
        }
    }
}
