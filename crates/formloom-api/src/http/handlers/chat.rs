//! Conversational endpoints.
//!
//! POST /api/v1/chat streams one agent turn as Server-Sent Events: the
//! session's agent events (wire-shaped, one JSON object per event)
//! followed by the generated assistant text, closed by a `done` event.
//! GET /api/v1/chat returns the ordered message history for a form.
//!
//! SSE event types:
//! - `agent_event` — one wire-shaped AgentEvent
//! - `text` — the assistant reply: `{ "text": "..." }`
//! - `done` — stream complete: `{}`

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use uuid::Uuid;

use formloom_core::agent::{AgentRunner, TurnOutcome};
use formloom_core::event::session_channel;
use formloom_core::repository::{FormRepository, MessageRepository, UsageLimiter};
use formloom_types::event::AgentEvent;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::success;
use crate::state::AppState;

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation turn(s) from the client; the last user message drives
    /// the turn. History is loaded server-side from the thread.
    pub messages: Vec<IncomingMessage>,
    /// Session binding. Absent for a brand-new conversation; the server
    /// assigns one and returns it in the `X-Form-Id` header.
    pub form_id: Option<Uuid>,
    #[serde(default)]
    pub options: Option<ChatOptions>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    /// Model override for this turn.
    pub model: Option<String>,
}

/// Query parameters for history retrieval.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub form_id: Uuid,
}

/// POST /api/v1/chat — run one agent turn, streaming events as SSE.
pub async fn stream_chat(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_text = body
        .messages
        .iter()
        .rev()
        .find(|m| m.role.eq_ignore_ascii_case("user"))
        .map(|m| m.content.clone())
        .ok_or_else(|| AppError::Validation("No user message in request".to_string()))?;

    let form_id = body.form_id.unwrap_or_else(Uuid::now_v7);

    // New conversations consume creation quota; check before any work.
    let form_exists = state
        .form_repo
        .get_form(&form_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .is_some();

    if !form_exists {
        let decision = state
            .limiter
            .check_limit(&user)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !decision.allowed {
            return Err(AppError::LimitExceeded {
                current: decision.current,
                limit: decision.limit,
            });
        }
    }

    // One orchestrator instance per session turn.
    if state.active_turns.insert(form_id, ()).is_some() {
        return Err(AppError::Conflict(
            "A turn is already running for this form".to_string(),
        ));
    }

    let mut config = (*state.config).clone();
    if let Some(model) = body.options.and_then(|o| o.model) {
        config.default_model = model;
    }

    let (emitter, rx) =
        session_channel(config.event_channel_capacity, form_id, user.user_id.clone());

    let turn_id = Uuid::now_v7();
    let turn_state = state.clone();
    let handle = tokio::spawn(async move {
        let runner = AgentRunner::from_config(&config);
        let outcome = runner
            .run_turn(
                &*turn_state.form_repo,
                &*turn_state.message_repo,
                &*turn_state.model,
                &config,
                &user,
                &user_text,
                &emitter,
            )
            .await;
        turn_state.active_turns.remove(&form_id);
        outcome
    });

    let headers = [
        ("x-turn-id", turn_id.to_string()),
        ("x-form-id", form_id.to_string()),
    ];

    Ok((
        headers,
        Sse::new(turn_stream(rx, handle, turn_id))
            .keep_alive(KeepAlive::new().interval(Duration::from_secs(15))),
    ))
}

/// Drain the session channel into SSE events, then close with the
/// assistant text and a `done` marker.
///
/// If the client disconnects, this stream is dropped and the receiver
/// goes with it; the runner observes the closed channel, stops emitting,
/// and still persists partial results in its detached task.
fn turn_stream(
    mut rx: mpsc::Receiver<AgentEvent>,
    handle: JoinHandle<TurnOutcome>,
    turn_id: Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let wire = event.to_wire();
            match serde_json::to_string(&wire) {
                Ok(json) => {
                    yield Ok::<_, Infallible>(Event::default().event("agent_event").data(json));
                }
                Err(err) => {
                    tracing::warn!(%turn_id, error = %err, "Failed to serialize event");
                }
            }
        }

        // Channel closed: the emitter is gone, so the turn has finished.
        match handle.await {
            Ok(outcome) => {
                let data = serde_json::json!({ "text": outcome.reply });
                yield Ok(Event::default().event("text").data(data.to_string()));
            }
            Err(err) => {
                tracing::error!(%turn_id, error = %err, "Turn task panicked");
                let data = serde_json::json!({ "message": "turn failed unexpectedly" });
                yield Ok(Event::default().event("error").data(data.to_string()));
            }
        }

        yield Ok(Event::default().event("done").data("{}"));
    }
}

/// GET /api/v1/chat?formId=... — ordered message history for a form.
pub async fn get_history(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let messages = state
        .message_repo
        .list_for_form(&query.form_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(success(messages))
}
