//! Error types for external tool execution.

use std::time::Duration;

/// Why a tool invocation produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("tool has empty command")]
    EmptyCommand,

    #[error("{program} not found")]
    NotFound { program: String },

    #[error("{program} timed out after {} seconds", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("io error running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl VerifyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, VerifyError::NotFound { .. })
    }
}

/// Result type for tool execution.
pub type Result<T> = std::result::Result<T, VerifyError>;
