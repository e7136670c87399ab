//! Ollama (local) client.

use super::{LlmHttpConfig, TextGenerator, build_http_client};
use crate::config::LlmConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ollama local LLM client.
pub struct OllamaClient {
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.2";

    /// Creates a new Ollama client.
    #[must_use]
    pub fn new() -> Self {
        let endpoint =
            std::env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_ENDPOINT.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());

        Self {
            endpoint,
            model,
            client: build_http_client(LlmHttpConfig::from_env()),
        }
    }

    /// Creates a client from configuration, environment filling the gaps.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut client = Self::new().with_http_config(LlmHttpConfig::from_config(config));
        if let Some(ref base_url) = config.base_url {
            client = client.with_endpoint(base_url.clone());
        }
        if let Some(ref model) = config.model {
            client = client.with_model(model.clone());
        }
        client
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

    /// Checks if Ollama is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    /// Makes a chat request to the Ollama API.
    fn chat(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: ChatOptions { temperature },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
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
                    provider = "ollama",
                    model = %self.model,
                    error = %e,
                    error_kind = error_kind,
                    "LLM chat request failed"
                );
                Error::OperationFailed {
                    operation: "ollama_chat".to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "ollama",
                model = %self.model,
                status = %status,
                body = %body,
                "LLM chat API returned error status"
            );
            return Err(Error::OperationFailed {
                operation: "ollama_chat".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        let response: ChatResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "ollama",
                model = %self.model,
                error = %e,
                "Failed to parse LLM chat response"
            );
            Error::OperationFailed {
                operation: "ollama_chat_response".to_string(),
                cause: e.to_string(),
            }
        })?;

        Ok(response.message.content)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
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

        self.chat(messages, temperature)
    }
}

/// Request to the Chat API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

/// Sampling options for the Chat API.
#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// A message in the chat.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the Chat API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new();
        assert_eq!(client.name(), "ollama");
    }

    #[test]
    fn test_client_configuration() {
        let client = OllamaClient::new()
            .with_endpoint("http://localhost:12345")
            .with_model("qwen2-math");

        assert_eq!(client.endpoint, "http://localhost:12345");
        assert_eq!(client.model, "qwen2-math");
    }

    #[test]
    fn test_default_values() {
        // This test doesn't set env vars, so uses the struct defaults
        let client = OllamaClient {
            endpoint: OllamaClient::DEFAULT_ENDPOINT.to_string(),
            model: OllamaClient::DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        };

        assert_eq!(client.endpoint, "http://localhost:11434");
        assert_eq!(client.model, "llama3.2");
    }

    #[test]
    fn test_from_config_applies_overrides() {
        let config = LlmConfig {
            base_url: Some("http://gpu-box:11434".to_string()),
            model: Some("deepseek-math".to_string()),
            ..LlmConfig::default()
        };
        let client = OllamaClient::from_config(&config);
        assert_eq!(client.endpoint, "http://gpu-box:11434");
        assert_eq!(client.model, "deepseek-math");
    }
}
