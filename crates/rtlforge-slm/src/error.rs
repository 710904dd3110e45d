//! Error types for rtlforge-slm

use thiserror::Error;

use rtlforge_core::GenerationError;

/// Errors talking to a generation endpoint
#[derive(Error, Debug)]
pub enum SlmError {
    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    /// Request did not complete in time
    #[error("SLM API timeout after {0}s")]
    Timeout(u64),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status
    #[error("SLM API error {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not JSON
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<SlmError> for GenerationError {
    fn from(err: SlmError) -> Self {
        match err {
            SlmError::Timeout(secs) => GenerationError::Timeout(secs),
            SlmError::Status { status, body } => GenerationError::Status { status, body },
            SlmError::Decode(msg) => GenerationError::Decode(msg),
            SlmError::ClientSetup(msg) | SlmError::Http(msg) => GenerationError::Transport(msg),
        }
    }
}
