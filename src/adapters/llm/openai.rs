//! OpenAI-compatible dialogue model adapter.
//!
//! Talks to any chat-completions endpoint (OpenAI or compatible) and asks
//! for a JSON object response. Price safety does not live here: the
//! generator ignores whatever price the model writes.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{DialogueModel, DialogueModelError, DialoguePrompt};

/// Configuration for the OpenAI-compatible dialogue model.
#[derive(Debug, Clone)]
pub struct OpenAiDialogueConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g. "gpt-4o").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout; the LLM deadline from the concurrency contract.
    pub timeout: Duration,
}

impl OpenAiDialogueConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(8),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible implementation of [`DialogueModel`].
pub struct OpenAiDialogueModel {
    config: OpenAiDialogueConfig,
    client: Client,
}

impl OpenAiDialogueModel {
    /// Creates a new model client with the given configuration.
    pub fn new(config: OpenAiDialogueConfig) -> Result<Self, DialogueModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DialogueModelError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl DialogueModel for OpenAiDialogueModel {
    async fn render(&self, prompt: &DialoguePrompt) -> Result<String, DialogueModelError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DialogueModelError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    DialogueModelError::Network(format!("connection failed: {}", e))
                } else {
                    DialogueModelError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => DialogueModelError::AuthenticationFailed,
                429 => DialogueModelError::Unavailable(format!("rate limited: {}", body)),
                500..=599 => {
                    DialogueModelError::Unavailable(format!("server error {}: {}", status, body))
                }
                _ => DialogueModelError::Network(format!("unexpected status {}: {}", status, body)),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DialogueModelError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DialogueModelError::Parse("empty completion".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

impl std::fmt::Debug for OpenAiDialogueModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDialogueModel")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}
