//! Domain-level error taxonomy for rtlforge.

/// Errors produced while validating an [`AgentConfig`](crate::config::AgentConfig).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("slm_max_length too small: {value} (min: {min})")]
    MaxLengthTooSmall { value: u32, min: u32 },

    #[error("temperature out of range: {0}")]
    TemperatureOutOfRange(String),
}

/// rtlforge domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RtlforgeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("config file error: {0}")]
    ConfigFile(String),

    #[error("invalid task file {path}: {reason}")]
    InvalidTask { path: String, reason: String },

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rtlforge domain operations.
pub type Result<T> = std::result::Result<T, RtlforgeError>;
