//! Agent event taxonomy and wire representation.
//!
//! `AgentEvent` is the envelope delivered over the per-session stream:
//! identity, session metadata, a strictly increasing sequence number, and
//! a category-grouped payload. The payload is a compile-time tagged enum;
//! consumers match exhaustively instead of inspecting runtime fields.
//!
//! The wire shape (one JSON object per event) is
//! `{id, category, type, timestamp, formId, userId, sequence, data}` --
//! see [`WireEvent`] and the `to_wire`/`from_wire` conversions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::agent::StateSnapshot;

/// The five event categories multiplexed onto one session channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    State,
    Progress,
    Error,
    System,
    Ui,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCategory::State => write!(f, "state"),
            EventCategory::Progress => write!(f, "progress"),
            EventCategory::Error => write!(f, "error"),
            EventCategory::System => write!(f, "system"),
            EventCategory::Ui => write!(f, "ui"),
        }
    }
}

/// Category-specific event payload.
///
/// The serde tag doubles as the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // -- state --
    /// Complete `{form, agentState, isComplete}` triple. Idempotent by
    /// construction: applying it twice yields the same consumer state.
    StateSnapshot(StateSnapshot),

    // -- progress --
    #[serde(rename_all = "camelCase")]
    TaskStarted { task_id: String, label: String },

    /// One generation task finished. Consumers increment a counter; the
    /// counter is not deduplicated by task id.
    #[serde(rename_all = "camelCase")]
    TaskCompleted { task_id: String, label: String },

    // -- error --
    #[serde(rename_all = "camelCase")]
    ToolError { tool: String, message: String },

    #[serde(rename_all = "camelCase")]
    GenerationError { message: String },

    // -- system --
    /// A new generation run has begun; consumers reset their task counters.
    AgentInitialized,

    /// Advisory message. When `planned_tasks` is present this is the
    /// planning marker: the total it reports is authoritative.
    #[serde(rename_all = "camelCase")]
    AgentWarning {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        planned_tasks: Option<u32>,
    },

    // -- ui --
    #[serde(rename_all = "camelCase")]
    ShowConfigButton { section: String },
}

impl EventPayload {
    /// The category this payload belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventPayload::StateSnapshot(_) => EventCategory::State,
            EventPayload::TaskStarted { .. } | EventPayload::TaskCompleted { .. } => {
                EventCategory::Progress
            }
            EventPayload::ToolError { .. } | EventPayload::GenerationError { .. } => {
                EventCategory::Error
            }
            EventPayload::AgentInitialized | EventPayload::AgentWarning { .. } => {
                EventCategory::System
            }
            EventPayload::ShowConfigButton { .. } => EventCategory::Ui,
        }
    }

    /// The wire `type` string (the serde tag).
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::StateSnapshot(_) => "state_snapshot",
            EventPayload::TaskStarted { .. } => "task_started",
            EventPayload::TaskCompleted { .. } => "task_completed",
            EventPayload::ToolError { .. } => "tool_error",
            EventPayload::GenerationError { .. } => "generation_error",
            EventPayload::AgentInitialized => "agent_initialized",
            EventPayload::AgentWarning { .. } => "agent_warning",
            EventPayload::ShowConfigButton { .. } => "show_config_button",
        }
    }

    /// The payload fields without the tag, for the wire `data` object.
    fn data(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).expect("event payload serializes");
        if let Some(obj) = value.as_object_mut() {
            obj.remove("type");
        }
        value
    }
}

/// One event on a session's ordered feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub id: Uuid,
    pub form_id: Uuid,
    pub user_id: String,
    /// Strictly increasing per session; consumers may use this to detect
    /// replays but the reference reducer applies events as delivered.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl AgentEvent {
    /// Flatten into the wire shape.
    pub fn to_wire(&self) -> WireEvent {
        WireEvent {
            id: self.id,
            category: self.payload.category(),
            event_type: self.payload.event_type().to_string(),
            timestamp: self.timestamp,
            form_id: self.form_id,
            user_id: self.user_id.clone(),
            sequence: self.sequence,
            data: self.payload.data(),
        }
    }

    /// Rebuild from the wire shape. Fails when the `type` field does not
    /// name a known payload or the data does not match its schema.
    pub fn from_wire(wire: WireEvent) -> Result<Self, serde_json::Error> {
        let mut data = wire.data;
        if let Some(obj) = data.as_object_mut() {
            obj.insert(
                "type".to_string(),
                serde_json::Value::String(wire.event_type),
            );
        }
        let payload: EventPayload = serde_json::from_value(data)?;
        Ok(Self {
            id: wire.id,
            form_id: wire.form_id,
            user_id: wire.user_id,
            sequence: wire.sequence,
            timestamp: wire.timestamp,
            payload,
        })
    }
}

/// The flat JSON object emitted to clients, one per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub id: Uuid,
    pub category: EventCategory,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub form_id: Uuid,
    pub user_id: String,
    pub sequence: u64,
    pub data: serde_json::Value,
}
