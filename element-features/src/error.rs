//! Error types for feature evaluation and settings persistence.

use element_config::ConfigError;
use thiserror::Error;

/// Result type for feature operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Result type for settings store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Feature-level errors.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Rejected at construction: zero variants, percentage outside [0, 1],
    /// dangling rollout references.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote config error: {0}")]
    Remote(String),

    #[error("Remote config fetch timed out")]
    RemoteTimeout,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// A writer panicked while holding the remote flag lock
    #[error("Remote flag lock poisoned")]
    Poisoned,
}

/// Settings store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error for key {key}: {message}")]
    Deserialization { key: String, message: String },

    /// A writer panicked while holding the store lock
    #[error("Settings store lock poisoned")]
    Poisoned,
}
