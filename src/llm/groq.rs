//! Groq client.
//!
//! Speaks the `OpenAI`-compatible chat completions API that Groq hosts.

use super::{LlmHttpConfig, TextGenerator, build_http_client};
use crate::config::LlmConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Groq hosted-inference client.
pub struct GroqClient {
    /// API key.
    api_key: Option<String>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl GroqClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.groq.com/openai/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama-3.3-70b-versatile";

    /// Creates a new Groq client.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("GROQ_API_KEY").ok();
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::from_env()),
        }
    }

    /// Creates a client from configuration, environment filling the gaps.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new().with_http_config(LlmHttpConfig::from_config(config));
        if let Some(ref api_key) = config.api_key {
            client = client.with_api_key(api_key.clone());
        }
        if let Some(ref base_url) = config.base_url {
            client = client.with_endpoint(base_url.clone());
        }
        if let Some(ref model) = config.model {
            client = client.with_model(model.clone());
        }
        client
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets HTTP client timeouts for LLM requests.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Validates that the client is configured.
    fn validate(&self) -> Result<()> {
        if self.api_key.is_none() {
            return Err(Error::OperationFailed {
                operation: "groq_request".to_string(),
                cause: "GROQ_API_KEY not set".to_string(),
            });
        }
        Ok(())
    }

    /// Makes a request to the chat completions API.
    fn request(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        self.validate()?;

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::OperationFailed {
                operation: "groq_request".to_string(),
                cause: "API key not configured".to_string(),
            })?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else if e.is_request() {
                    "request"
                } else {
                    "unknown"
                };
                tracing::error!(
                    provider = "groq",
                    model = %self.model,
                    error = %e,
                    error_kind = error_kind,
                    "LLM request failed"
                );
                Error::OperationFailed {
                    operation: "groq_request".to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "groq",
                model = %self.model,
                status = %status,
                body = %body,
                "LLM API returned error status"
            );
            return Err(Error::OperationFailed {
                operation: "groq_request".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        let response: ChatCompletionResponse =
            response.json().map_err(|e| Error::OperationFailed {
                operation: "groq_response".to_string(),
                cause: e.to_string(),
            })?;

        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| Error::OperationFailed {
                operation: "groq_response".to_string(),
                cause: "No choices in response".to_string(),
            })
    }
}

impl Default for GroqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for GroqClient {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn generate(&self, system: &str, user: &str, temperature: f32) -> Result<String> {
        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ];

        self.request(messages, temperature)
    }
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

/// A message in the chat.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GroqClient::new();
        assert_eq!(client.name(), "groq");
        assert_eq!(client.model, GroqClient::DEFAULT_MODEL);
        assert_eq!(client.endpoint, GroqClient::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_client_configuration() {
        let client = GroqClient::new()
            .with_api_key("test-key")
            .with_endpoint("https://custom.endpoint")
            .with_model("llama-3.1-8b-instant");

        assert_eq!(client.api_key, Some("test-key".to_string()));
        assert_eq!(client.endpoint, "https://custom.endpoint");
        assert_eq!(client.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_validate_no_key() {
        let client = GroqClient {
            api_key: None,
            endpoint: GroqClient::DEFAULT_ENDPOINT.to_string(),
            model: GroqClient::DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        };

        let result = client.validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_with_key() {
        let client = GroqClient::new().with_api_key("test-key");
        let result = client.validate();
        assert!(result.is_ok());
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let config = LlmConfig {
            model: Some("mixtral-8x7b".to_string()),
            api_key: Some("cfg-key".to_string()),
            base_url: Some("http://proxy.local/v1".to_string()),
            ..LlmConfig::default()
        };
        let client = GroqClient::from_config(&config);
        assert_eq!(client.model, "mixtral-8x7b");
        assert_eq!(client.api_key, Some("cfg-key".to_string()));
        assert_eq!(client.endpoint, "http://proxy.local/v1");
    }
}
