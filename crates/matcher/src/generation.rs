//! Text generation for the optional answer step.
//!
//! Both providers speak the OpenAI chat-completions protocol; the local
//! server is reached through its OpenAI-compatible base URL without a key.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::resolver::GenerationMethod;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_url: String,
    pub api_model: String,
    pub local_server_url: String,
    pub local_server_model: String,
    pub timeout_secs: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".into(),
            api_model: "gpt-4o-mini".into(),
            local_server_url: "http://localhost:11434/v1".into(),
            local_server_model: "llama3.2".into(),
            timeout_secs: 60,
            max_tokens: 600,
            temperature: 0.2,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.timeout_secs == 0 {
            return Err(GenerationError::InvalidConfig(
                "timeout_secs must be at least one second".into(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(GenerationError::InvalidConfig(
                "max_tokens must be greater than zero".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerationError::InvalidConfig(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
    #[error(
        "generation request failed ({}): {message}",
        .status.map_or_else(|| "no response".to_string(), |s| format!("HTTP {s}"))
    )]
    Http {
        status: Option<u16>,
        message: String,
    },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("model returned an empty answer")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn method(&self) -> GenerationMethod;

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Shared chat-completions client.
struct ChatEndpoint {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
    max_tokens: usize,
    temperature: f32,
}

impl ChatEndpoint {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };
        debug!(model = %self.model, url = %url, "requesting chat completion");

        let mut request = self.client.post(&url).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| GenerationError::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// OpenAI (or compatible) chat completions with the caller's key.
pub struct OpenAiGenerator {
    endpoint: ChatEndpoint,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, cfg: &GenerationConfig, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: ChatEndpoint {
                client,
                base_url: cfg.api_url.clone(),
                model: cfg.api_model.clone(),
                api_key: Some(api_key.into()),
                timeout: Duration::from_secs(cfg.timeout_secs),
                max_tokens: cfg.max_tokens,
                temperature: cfg.temperature,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::Remote
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        self.endpoint.complete(system, prompt).await
    }
}

/// Ollama-style server on the same machine.
pub struct LocalServerGenerator {
    endpoint: ChatEndpoint,
}

impl LocalServerGenerator {
    pub fn new(client: reqwest::Client, cfg: &GenerationConfig) -> Self {
        Self {
            endpoint: ChatEndpoint {
                client,
                base_url: cfg.local_server_url.clone(),
                model: cfg.local_server_model.clone(),
                api_key: None,
                timeout: Duration::from_secs(cfg.timeout_secs),
                max_tokens: cfg.max_tokens,
                temperature: cfg.temperature,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for LocalServerGenerator {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::LocalServer
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        self.endpoint.complete(system, prompt).await
    }
}
