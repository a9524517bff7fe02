//! Reasoning backend over an OpenAI-compatible chat-completions endpoint.

use super::body_excerpt;
use crate::federation::ports::{
    ReasoningBackend, ReasoningError, ReasoningPrompt, ReasoningResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Sampling temperature for routing replies; kept low for stable decisions.
const ROUTING_TEMPERATURE: f64 = 0.1;

/// Upper bound on reply length.
const MAX_REPLY_TOKENS: u32 = 1000;

/// Connection settings for a chat-completions service.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatCompletionsConfig {
    /// Base URL, e.g. `https://api.groq.com/openai/v1`.
    pub base_url: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl std::fmt::Debug for ChatCompletionsConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ChatCompletionsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Reasoning backend that asks a chat model for a JSON routing decision.
#[derive(Debug, Clone)]
pub struct ChatCompletionsReasoner {
    http: reqwest::Client,
    config: ChatCompletionsConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
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
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsReasoner {
    /// Creates a reasoner over a shared connection pool.
    #[must_use]
    pub const fn new(http: reqwest::Client, config: ChatCompletionsConfig) -> Self {
        Self { http, config }
    }

    /// Returns the configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// Parses a model reply as a JSON object, tolerating Markdown code fences.
fn parse_reply(content: &str) -> ReasoningResult<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let parsed: Value = serde_json::from_str(unfenced)
        .map_err(|err| ReasoningError::InvalidReply(err.to_string()))?;
    if !parsed.is_object() {
        return Err(ReasoningError::InvalidReply(
            "reply is not a JSON object".to_owned(),
        ));
    }
    Ok(parsed)
}

#[async_trait]
impl ReasoningBackend for ChatCompletionsReasoner {
    #[instrument(skip(self, prompt), fields(model = %self.config.model))]
    async fn complete(&self, prompt: &ReasoningPrompt) -> ReasoningResult<Value> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: ROUTING_TEMPERATURE,
            max_tokens: MAX_REPLY_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!("sending routing prompt to reasoning service");
        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ReasoningError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|err| ReasoningError::InvalidReply(err.to_string()))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ReasoningError::InvalidReply("reply had no content".to_owned()))?;
        parse_reply(&content)
    }
}
