//! LanguageModel trait definition.
//!
//! The core abstraction the orchestrator and tool executors drive.
//! Uses RPITIT (native async fn in traits, Rust 2024 edition) consistent
//! with all project traits -- no `async_trait` macro.

use formloom_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for language-model backends.
///
/// One request per orchestrator step or generation phase; responses are
/// full (non-streaming) and may carry a single tool call when the model
/// stopped with `tool_use`.
///
/// Implementations live in formloom-infra (e.g., `AnthropicModel`).
pub trait LanguageModel: Send + Sync {
    /// Human-readable backend name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
