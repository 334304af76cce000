//! Core error types for focusguard-core.
//!
//! Unparseable replies are not errors (the negotiation simply re-prompts) and
//! collaborator failures are downgraded to logged outcomes at the call site.
//! What remains here are invalid state transitions, bad values, and the
//! configuration layer.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusguard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An operation was attempted from a state that does not allow it.
    #[error("Invalid state for {entity}: {message}")]
    InvalidState { entity: String, message: String },

    /// A caller-supplied value is out of range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// An injected collaborator (browser, analyzer, callback) failed.
    #[error("Collaborator '{name}' failed: {message}")]
    Collaborator { name: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    pub fn invalid_state(entity: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn collaborator(name: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Collaborator {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
