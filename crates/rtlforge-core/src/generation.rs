//! Generative-model seam consumed by the refinement engine.

use async_trait::async_trait;

/// Why a generation call produced no text. The engine treats every variant
/// the same way; the distinction is for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("empty response")]
    Empty,
}

/// Anything that turns a prompt into model text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns a single canonical text result or a structured failure.
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> std::result::Result<String, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        assert_eq!(
            GenerationError::Timeout(300).to_string(),
            "generation timed out after 300 seconds"
        );
        let err = GenerationError::Status {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "endpoint returned status 503: overloaded");
    }
}
