//! Error types for Inbox Pulse.

use std::time::Duration;

/// Top-level error type for the analysis core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Malformed-input errors — rejected immediately, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Message content is empty after normalization")]
    EmptyContent,

    #[error("Malformed email address: {email}")]
    InvalidEmail { email: String },

    #[error("Unknown source platform: {value}")]
    UnknownPlatform { value: String },
}

/// Upstream classification/extraction failures.
///
/// Recovered locally via the degraded-result path — callers of `analyze`
/// never see these as hard failures.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Classifier failed: {0}")]
    Classifier(String),

    #[error("Action extraction failed: {0}")]
    Extractor(String),

    #[error("{step} timed out after {timeout:?}")]
    Timeout { step: &'static str, timeout: Duration },
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Concurrent analysis in progress for message {message_id}")]
    Conflict { message_id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for the analysis core.
pub type Result<T> = std::result::Result<T, Error>;
