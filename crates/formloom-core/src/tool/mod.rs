//! Tool executors invoked by the agent loop.
//!
//! Each tool is an incremental producer: it performs its mutation in
//! phases and emits one event per phase transition into the session
//! stream. Errors inside an executor are caught at the dispatch boundary
//! and converted into a structured `{success, error}` result for the
//! model -- they never abort the orchestrator step. The one exception is
//! a transport failure, which is terminal for the whole turn.

pub mod context;
pub mod create_form;
pub mod update_form;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};

use formloom_types::agent::{AgentState, AgentStatus, StateSnapshot};
use formloom_types::config::GlobalConfig;
use formloom_types::error::{ToolError, TransportError};
use formloom_types::event::EventPayload;
use formloom_types::form::{FormSnapshot, FormVersion};
use formloom_types::identity::AuthUser;
use formloom_types::llm::{CompletionRequest, CompletionResponse, LlmError, ToolDefinition};

use crate::event::EventEmitter;
use crate::llm::LanguageModel;
use crate::repository::FormRepository;

use self::context::{GetFormContextInput, QueryDocsInput, ShowConfigButtonInput};
use self::create_form::CreateFormInput;
use self::update_form::UpdateFormInput;

/// The tools the driving model may select, at most one per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    CreateForm,
    UpdateForm,
    QueryDocs,
    ShowConfigButton,
    GetFormContext,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateForm => "createForm",
            ToolName::UpdateForm => "updateForm",
            ToolName::QueryDocs => "queryDocs",
            ToolName::ShowConfigButton => "showConfigButton",
            ToolName::GetFormContext => "getFormContext",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createForm" => Ok(ToolName::CreateForm),
            "updateForm" => Ok(ToolName::UpdateForm),
            "queryDocs" => Ok(ToolName::QueryDocs),
            "showConfigButton" => Ok(ToolName::ShowConfigButton),
            "getFormContext" => Ok(ToolName::GetFormContext),
            other => Err(format!("unknown tool: '{other}'")),
        }
    }
}

/// Structured result fed back to the driving model after a tool step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub output: serde_json::Value,
}

impl ToolOutcome {
    pub fn ok(output: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            output,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            output: serde_json::Value::Null,
        }
    }
}

/// Everything a tool executor needs for one invocation.
///
/// The form id comes from the emitter: one session, one form binding.
pub struct ToolRuntime<'a, R, M> {
    pub repo: &'a R,
    pub model: &'a M,
    pub events: &'a EventEmitter,
    pub user: &'a AuthUser,
    pub config: &'a GlobalConfig,
}

/// Tool definitions advertised to the driving model, with JSON Schema
/// input contracts generated from the Rust input types.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition::<CreateFormInput>(
            ToolName::CreateForm,
            "Create a new form from a natural-language description. Plans the \
             questions, generates each one, and saves a draft. Use only when no \
             form exists yet for this conversation.",
        ),
        definition::<UpdateFormInput>(
            ToolName::UpdateForm,
            "Apply add/update/remove question actions (and title or description \
             changes) to the conversation's draft form.",
        ),
        definition::<QueryDocsInput>(
            ToolName::QueryDocs,
            "Look up product documentation about question types, publishing, and \
             form behavior.",
        ),
        definition::<ShowConfigButtonInput>(
            ToolName::ShowConfigButton,
            "Surface a configuration button in the user's editor for a settings \
             section the user should review manually.",
        ),
        definition::<GetFormContextInput>(
            ToolName::GetFormContext,
            "Fetch the current form and its draft so you can reason about what \
             already exists before making changes.",
        ),
    ]
}

fn definition<T: JsonSchema>(name: ToolName, description: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.as_str().to_string(),
        description: description.to_string(),
        input_schema: serde_json::to_value(schema_for!(T)).expect("schema serializes"),
    }
}

/// Execute one tool call, converting executor errors into a structured
/// failure result.
///
/// Transport failures bubble out as `Err`: the stream is gone and the
/// turn must stop emitting. Every other error becomes a
/// `{success: false, error}` outcome plus an error-category event, and
/// the driving model decides what to do next.
pub async fn dispatch<R, M>(
    name: &str,
    input: serde_json::Value,
    runtime: &ToolRuntime<'_, R, M>,
) -> Result<ToolOutcome, TransportError>
where
    R: FormRepository,
    M: LanguageModel,
{
    let tool = match ToolName::from_str(name) {
        Ok(tool) => tool,
        Err(message) => {
            tracing::warn!(tool = name, "Model selected an unknown tool");
            return Ok(ToolOutcome::failed(message));
        }
    };

    let result = match tool {
        ToolName::CreateForm => {
            run_parsed(input, |parsed| create_form::run(parsed, runtime)).await
        }
        ToolName::UpdateForm => {
            run_parsed(input, |parsed| update_form::run(parsed, runtime)).await
        }
        ToolName::QueryDocs => run_parsed(input, |parsed| context::query_docs(parsed)).await,
        ToolName::ShowConfigButton => {
            run_parsed(input, |parsed| context::show_config_button(parsed, runtime)).await
        }
        ToolName::GetFormContext => {
            run_parsed(input, |parsed| context::get_form_context(parsed, runtime)).await
        }
    };

    match result {
        Ok(output) => Ok(ToolOutcome::ok(output)),
        Err(ToolError::Transport(err)) => Err(err),
        Err(err) => {
            tracing::warn!(tool = %tool, error = %err, "Tool execution failed");
            runtime
                .events
                .emit(EventPayload::ToolError {
                    tool: tool.as_str().to_string(),
                    message: err.to_string(),
                })
                .await?;
            Ok(ToolOutcome::failed(err.to_string()))
        }
    }
}

async fn run_parsed<T, F, Fut>(
    input: serde_json::Value,
    run: F,
) -> Result<serde_json::Value, ToolError>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, ToolError>>,
{
    let parsed: T =
        serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    run(parsed).await
}

/// Emit a `state_snapshot` built from a version row.
pub(crate) async fn emit_snapshot(
    events: &EventEmitter,
    version: &FormVersion,
    status: AgentStatus,
    is_complete: bool,
) -> Result<(), TransportError> {
    events
        .emit(EventPayload::StateSnapshot(StateSnapshot {
            form: Some(FormSnapshot::from_version(version)),
            agent_state: AgentState::new(status),
            is_complete,
        }))
        .await
}

/// Run an ancillary generation call under the configured wall-clock bound.
pub(crate) async fn complete_bounded<M: LanguageModel>(
    model: &M,
    request: &CompletionRequest,
    config: &GlobalConfig,
) -> Result<CompletionResponse, LlmError> {
    tokio::time::timeout(
        Duration::from_secs(config.generation_timeout_secs),
        model.complete(request),
    )
    .await
    .map_err(|_| LlmError::Timeout)?
}

/// Extract a JSON object from model output, tolerating code fences.
pub(crate) fn parse_json_payload(content: &str) -> Result<serde_json::Value, ToolError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| ToolError::Generation(format!("model returned invalid JSON: {e}")))
}
