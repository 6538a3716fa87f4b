//! AnthropicModel -- concrete [`LanguageModel`] implementation for the
//! Anthropic Messages API (`/v1/messages`), non-streaming with tool use.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use formloom_core::llm::LanguageModel;
use formloom_types::chat::MessageRole;
use formloom_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, ToolCall, Usage,
};

use super::types::{
    AnthropicContentBlock, AnthropicErrorResponse, AnthropicMessage, AnthropicRequest,
    AnthropicResponse, AnthropicTool,
};

/// Anthropic Claude language model client.
pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AnthropicModel {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new client.
    ///
    /// The outer request timeout is generous (5 minutes); callers that need
    /// a tighter bound (ancillary generation calls) wrap `complete` in
    /// their own timeout.
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Read the API key from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, LlmError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::Auth("ANTHROPIC_API_KEY is not set".to_string()))?;
        Ok(Self::new(SecretString::from(key)))
    }

    fn to_anthropic_request(request: &CompletionRequest) -> AnthropicRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    // The Messages API has no system role in the list;
                    // system content goes in the top-level field.
                    MessageRole::System | MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages,
            system: request.system.clone(),
            temperature: request.temperature,
            stop_sequences: request.stop_sequences.clone(),
            tools: request
                .tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.input_schema.clone(),
                })
                .collect(),
        }
    }

    fn from_anthropic_response(response: AnthropicResponse) -> CompletionResponse {
        let mut content = String::new();
        let mut tool_call = None;

        for block in response.content {
            match block {
                AnthropicContentBlock::Text { text } => content.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    // At most one tool per step; keep the first.
                    if tool_call.is_none() {
                        tool_call = Some(ToolCall { id, name, input });
                    }
                }
                AnthropicContentBlock::Other => {}
            }
        }

        let stop_reason = response
            .stop_reason
            .as_deref()
            .and_then(|s| StopReason::from_str(s).ok())
            .unwrap_or(StopReason::EndTurn);

        CompletionResponse {
            id: response.id,
            content,
            tool_call,
            model: response.model,
            stop_reason,
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        }
    }

    fn error_from_status(status: reqwest::StatusCode, body: String) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::Auth("invalid or missing API key".to_string()),
            429 => LlmError::RateLimited,
            code => {
                let message = serde_json::from_str::<AnthropicErrorResponse>(&body)
                    .map(|e| format!("{}: {}", e.error.error_type, e.error.message))
                    .unwrap_or(body);
                LlmError::Api { status: code, message }
            }
        }
    }
}

// AnthropicModel intentionally does NOT derive Debug. The SecretString
// field already refuses to print the key, but omitting Debug entirely
// keeps internal state out of logs.

impl LanguageModel for AnthropicModel {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_anthropic_request(request);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error_from_status(status, body));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            model = %parsed.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Anthropic completion"
        );

        Ok(Self::from_anthropic_response(parsed))
    }
}
