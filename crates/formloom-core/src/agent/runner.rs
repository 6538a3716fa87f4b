//! Agent runner: one user turn through the bounded tool loop.
//!
//! Each step sends the conversation plus the five tool definitions to the
//! driving model. A `tool_use` stop executes exactly one tool and feeds
//! the structured result back; an `end_turn` stop finishes the turn. The
//! loop is bounded by the step budget (default 5).
//!
//! Failure handling follows the turn contract:
//! - a tool error never aborts the step (the model sees the failure and
//!   decides what to do);
//! - a model error ends the turn as FAILED via an error-category event;
//! - a transport failure is terminal: emission stops immediately, but
//!   partial results are still persisted server-side;
//! - an assistant message is persisted even when everything else failed,
//!   so the conversation thread is never silently truncated.
//!
//! Turn success is judged solely by the final `state_snapshot` with
//! `is_complete = true`: COMPLETED means success.

use formloom_types::agent::{AgentState, AgentStatus, StateSnapshot};
use formloom_types::chat::{ChatMessage, MessageRole};
use formloom_types::config::GlobalConfig;
use formloom_types::error::TransportError;
use formloom_types::event::EventPayload;
use formloom_types::form::{FormSnapshot, VersionStatus};
use formloom_types::identity::AuthUser;
use formloom_types::llm::{CompletionRequest, Message};

use crate::event::EventEmitter;
use crate::llm::LanguageModel;
use crate::repository::{FormRepository, MessageRepository};
use crate::tool::{ToolRuntime, dispatch, tool_definitions};

use super::prompt::build_system_prompt;

/// Fallback reply persisted when the turn failed outright.
const FALLBACK_FAILURE: &str =
    "Something went wrong while working on your form. Please try again.";

/// Fallback reply when the step budget ran out before a final answer.
const FALLBACK_BUDGET: &str =
    "I've applied the changes I could within this turn. Ask me to continue if anything is missing.";

/// Drives one bounded tool-calling turn.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    /// Step budget for one turn (model calls, tool or final answer each).
    pub max_steps: usize,
}

impl Default for AgentRunner {
    fn default() -> Self {
        Self { max_steps: 5 }
    }
}

impl AgentRunner {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            max_steps: config.max_steps,
        }
    }

    /// Run one user turn. Infallible by design: every failure mode folds
    /// into the returned outcome and the persisted conversation thread.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_turn<R, Msg, M>(
        &self,
        repo: &R,
        messages: &Msg,
        model: &M,
        config: &GlobalConfig,
        user: &AuthUser,
        user_text: &str,
        events: &EventEmitter,
    ) -> TurnOutcome
    where
        R: FormRepository,
        Msg: MessageRepository,
        M: LanguageModel,
    {
        let form_id = events.form_id();

        // Snapshot the prior thread before persisting the new message, so
        // the model does not see the current input twice.
        let history = load_history(messages, events).await;

        // Persist the user message up front; losing it would break retry.
        let user_message =
            ChatMessage::new(form_id, user.user_id.clone(), MessageRole::User, user_text);
        if let Err(err) = messages.save_message(&user_message).await {
            tracing::warn!(%form_id, error = %err, "Failed to persist user message");
        }

        let driven = self
            .drive_loop(repo, model, config, user, user_text, history, events)
            .await;

        let (status, reply, steps_used) = match driven {
            Ok(result) => result,
            Err(TransportError::ChannelClosed) => {
                tracing::warn!(
                    %form_id,
                    "Event stream closed mid-turn; persisting partial results"
                );
                (AgentStatus::Failed, FALLBACK_FAILURE.to_string(), 0)
            }
        };

        // The assistant reply lands in the thread no matter what happened.
        let assistant_message = ChatMessage::new(
            form_id,
            user.user_id.clone(),
            MessageRole::Assistant,
            reply.clone(),
        );
        if let Err(err) = messages.save_message(&assistant_message).await {
            tracing::warn!(%form_id, error = %err, "Failed to persist assistant message");
        }

        // Terminal snapshot: the one consumers judge success by. Skipped
        // entirely when the transport already failed.
        if !events.is_closed() {
            let form = snapshot_current_form(repo, events).await;
            let _ = events
                .emit(EventPayload::StateSnapshot(StateSnapshot {
                    form,
                    agent_state: AgentState::with_input(status, user_text),
                    is_complete: true,
                }))
                .await;
        }

        TurnOutcome {
            status,
            reply,
            steps_used,
        }
    }

    /// The step loop proper. Transport errors bubble; everything else is
    /// folded into the returned (status, reply, steps) triple.
    #[allow(clippy::too_many_arguments)]
    async fn drive_loop<R, M>(
        &self,
        repo: &R,
        model: &M,
        config: &GlobalConfig,
        user: &AuthUser,
        user_text: &str,
        history: Vec<Message>,
        events: &EventEmitter,
    ) -> Result<(AgentStatus, String, usize), TransportError>
    where
        R: FormRepository,
        M: LanguageModel,
    {
        let form_id = events.form_id();

        events.emit(EventPayload::AgentInitialized).await?;
        events
            .emit(EventPayload::StateSnapshot(StateSnapshot {
                form: snapshot_current_form(repo, events).await,
                agent_state: AgentState::with_input(AgentStatus::Initializing, user_text),
                is_complete: false,
            }))
            .await?;

        let mut conversation = history;
        conversation.push(Message {
            role: MessageRole::User,
            content: user_text.to_string(),
        });

        let runtime = ToolRuntime {
            repo,
            model,
            events,
            user,
            config,
        };
        let tools = tool_definitions();
        let system_prompt = build_system_prompt();
        let mut steps_used = 0usize;

        for step in 0..self.max_steps {
            let request = CompletionRequest {
                model: config.default_model.clone(),
                messages: conversation.clone(),
                system: Some(system_prompt.clone()),
                max_tokens: 4096,
                temperature: Some(0.7),
                tools: tools.clone(),
                stop_sequences: None,
            };

            let response = match model.complete(&request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(%form_id, step, error = %err, "Model call failed");
                    events
                        .emit(EventPayload::GenerationError {
                            message: err.to_string(),
                        })
                        .await?;
                    return Ok((AgentStatus::Failed, FALLBACK_FAILURE.to_string(), steps_used));
                }
            };
            steps_used = step + 1;

            let Some(tool_call) = response.tool_call else {
                // end_turn: the model's text is the reply.
                return Ok((AgentStatus::Completed, response.content, steps_used));
            };

            tracing::debug!(%form_id, step, tool = %tool_call.name, "Executing tool");

            // Transport failures bubble; tool failures come back as a
            // structured outcome for the model.
            let outcome = dispatch(&tool_call.name, tool_call.input.clone(), &runtime).await?;

            conversation.push(Message {
                role: MessageRole::Assistant,
                content: format_tool_request(&response.content, &tool_call.name, &tool_call.input),
            });
            conversation.push(Message {
                role: MessageRole::User,
                content: format!(
                    "Tool result for {}:\n{}",
                    tool_call.name,
                    serde_json::to_string(&outcome).unwrap_or_default()
                ),
            });
        }

        // Budget exhausted without a final answer. The work done so far is
        // persisted; the turn itself still counts as completed.
        tracing::debug!(%form_id, max_steps = self.max_steps, "Step budget exhausted");
        Ok((AgentStatus::Completed, FALLBACK_BUDGET.to_string(), steps_used))
    }
}

/// Result of one agent turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub status: AgentStatus,
    pub reply: String,
    pub steps_used: usize,
}

/// Render an assistant step for the conversation transcript.
fn format_tool_request(content: &str, tool: &str, input: &serde_json::Value) -> String {
    let text = content.trim();
    if text.is_empty() {
        format!("[calling {tool} with {input}]")
    } else {
        format!("{text}\n[calling {tool} with {input}]")
    }
}

/// Project the form's working content for a snapshot, draft first.
async fn snapshot_current_form<R: FormRepository>(
    repo: &R,
    events: &EventEmitter,
) -> Option<FormSnapshot> {
    let form_id = events.form_id();
    for status in [VersionStatus::Draft, VersionStatus::Published] {
        match repo.get_version_by_status(&form_id, status).await {
            Ok(Some(version)) => return Some(FormSnapshot::from_version(&version)),
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(%form_id, error = %err, "Failed to load version for snapshot");
                return None;
            }
        }
    }
    None
}

/// Prior conversation for the model, oldest first. Best effort: a storage
/// failure yields an empty history rather than a dead turn.
async fn load_history<Msg: MessageRepository>(
    messages: &Msg,
    events: &EventEmitter,
) -> Vec<Message> {
    let form_id = events.form_id();
    let history = match messages.list_for_form(&form_id).await {
        Ok(history) => history,
        Err(err) => {
            tracing::warn!(%form_id, error = %err, "Failed to load conversation history");
            return Vec::new();
        }
    };

    history
        .into_iter()
        .filter(|msg| msg.role != MessageRole::System)
        .map(|msg| Message {
            role: msg.role,
            content: msg.content,
        })
        .collect()
}
