//! Error types shared across the workspace
//!
//! - `BridgeError`: the failure a bridge operation hands back to the UI
//! - `ConfigError`: loading and validating panel configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Failure of a bridge operation, as seen by the caller
///
/// Serialisable so hosts can hand it back across the bridge unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BridgeError {
    /// No operation registered under this name
    #[error("unknown operation: '{name}'")]
    UnknownOperation {
        /// Name the caller asked for
        name: String,
    },

    /// Payload did not decode into the operation's input shape
    #[error("invalid payload for {operation}: {message}")]
    InvalidPayload {
        /// Operation name
        operation: String,
        /// Decoder message
        message: String,
    },

    /// The operation ran and failed
    #[error("{operation} failed: {message}")]
    Failed {
        /// Operation name
        operation: String,
        /// Underlying failure
        message: String,
    },
}

impl BridgeError {
    /// Create a failure for an operation
    pub fn failed(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Operation name this error belongs to, if known
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::UnknownOperation { name } => name,
            Self::InvalidPayload { operation, .. } | Self::Failed { operation, .. } => operation,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the panel schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required setting is missing
    #[error("missing setting: {0}")]
    Missing(&'static str),

    /// A setting has an unusable value
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_serialises_with_kind_tag() {
        let err = BridgeError::failed("addLink", "connection refused");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "failed");
        assert_eq!(value["operation"], "addLink");
        assert_eq!(err.to_string(), "addLink failed: connection refused");
    }

    #[test]
    fn operation_name_is_exposed() {
        let err = BridgeError::UnknownOperation {
            name: "dropTable".into(),
        };
        assert_eq!(err.operation(), "dropTable");
    }
}
