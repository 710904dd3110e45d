//! HTTP client for `/generate` style endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use rtlforge_core::{AgentConfig, GenerationError, Generator};

use crate::error::SlmError;

/// Response fields probed for the generated text, in order.
pub const TEXT_FIELDS: [&str; 5] = ["generated_text", "text", "response", "output", "result"];

#[derive(Debug, Clone, PartialEq)]
pub struct SlmConfig {
    /// Base URL, without the `/generate` suffix.
    pub api_url: String,
    pub model: String,
    pub max_length: u32,
    pub timeout: Duration,
}

impl From<&AgentConfig> for SlmConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            api_url: config.slm_api_url.clone(),
            model: config.slm_model.clone(),
            max_length: config.slm_max_length,
            timeout: Duration::from_secs(config.slm_timeout_secs),
        }
    }
}

impl SlmConfig {
    pub fn endpoint(&self) -> String {
        format!("{}/generate", self.api_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    max_length: u32,
    model: &'a str,
    temperature: f32,
}

/// Pull the generated text out of a response body. Returns the field it
/// came from, or `None` when the whole document was used.
pub fn response_text(data: &Value) -> (String, Option<&'static str>) {
    for field in TEXT_FIELDS {
        if let Some(value) = data.get(field) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return (text, Some(field));
        }
    }
    (data.to_string(), None)
}

/// Generation client for a small-language-model HTTP endpoint.
pub struct SlmClient {
    config: SlmConfig,
    http_client: reqwest::Client,
}

impl SlmClient {
    pub fn new(config: SlmConfig) -> Result<Self, SlmError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("rtlforge-slm/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| SlmError::ClientSetup(e.to_string()))?;

        info!(
            url = %config.api_url,
            model = %config.model,
            max_length = config.max_length,
            "Initialized SLM API client"
        );
        Ok(Self {
            config,
            http_client,
        })
    }

    /// POST the prompt and return the generated text.
    pub async fn request(&self, prompt: &str, temperature: f32) -> Result<String, SlmError> {
        let endpoint = self.config.endpoint();
        info!(
            endpoint = %endpoint,
            model = %self.config.model,
            temperature = temperature,
            prompt_chars = prompt.len(),
            "Calling SLM API"
        );

        let payload = GenerateRequest {
            prompt,
            max_length: self.config.max_length,
            model: &self.config.model,
            temperature,
        };

        let response = self
            .http_client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| SlmError::Decode(e.to_string()))?;

        let (text, field) = response_text(&data);
        match field {
            Some(field) => info!(bytes = text.len(), field = field, "Received response"),
            None => warn!(bytes = text.len(), "Unknown response format, returning as string"),
        }
        debug!(response = %text, "Generated text");
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> SlmError {
        if err.is_timeout() {
            SlmError::Timeout(self.config.timeout.as_secs())
        } else {
            SlmError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl Generator for SlmClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        self.request(prompt, temperature).await.map_err(|e| {
            error!(error = %e, "SLM API request failed");
            GenerationError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_text_field_priority() {
        let data = json!({"text": "second", "generated_text": "first"});
        assert_eq!(
            response_text(&data),
            ("first".to_string(), Some("generated_text"))
        );
        let data = json!({"output": "module m(); endmodule"});
        assert_eq!(response_text(&data).1, Some("output"));
    }

    #[test]
    fn test_response_text_falls_back_to_document() {
        let data = json!({"choices": [{"content": "x"}]});
        let (text, field) = response_text(&data);
        assert!(field.is_none());
        assert!(text.contains("choices"));
    }

    #[test]
    fn test_response_text_non_string_field() {
        let data = json!({"result": ["a", "b"]});
        assert_eq!(response_text(&data).0, r#"["a","b"]"#);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest {
            prompt: "p",
            max_length: 8192,
            model: "deepseek",
            temperature: 0.5,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"prompt": "p", "max_length": 8192, "model": "deepseek", "temperature": 0.5})
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = SlmConfig {
            api_url: "http://localhost:8000/".to_string(),
            model: "m".to_string(),
            max_length: 1024,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(config.endpoint(), "http://localhost:8000/generate");
    }

    #[test]
    fn test_config_from_agent_config() {
        let config = SlmConfig::from(&AgentConfig::default());
        assert_eq!(config.api_url, "http://host.docker.internal:8000");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }
}
