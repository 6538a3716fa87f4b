//! Agent run state carried inside state snapshots.

use serde::{Deserialize, Serialize};

use crate::form::FormSnapshot;

/// Lifecycle status of one agent turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Initializing,
    Running,
    Completed,
    Failed,
}

/// The agent's run state as seen by clients.
///
/// `user_input` carries the originating message so a FAILED state can
/// seed a retry affordance without a server round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,
}

impl AgentState {
    pub fn new(status: AgentStatus) -> Self {
        Self {
            status,
            user_input: None,
        }
    }

    pub fn with_input(status: AgentStatus, user_input: impl Into<String>) -> Self {
        Self {
            status,
            user_input: Some(user_input.into()),
        }
    }
}

/// Full-state payload of a `state_snapshot` event.
///
/// Snapshots replace, never merge: applying the same snapshot twice leaves
/// consumer state unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormSnapshot>,
    pub agent_state: AgentState,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_status_serializes_screaming() {
        let json = serde_json::to_value(AgentStatus::Initializing).unwrap();
        assert_eq!(json, "INITIALIZING");
        let parsed: AgentStatus = serde_json::from_value(serde_json::json!("FAILED")).unwrap();
        assert_eq!(parsed, AgentStatus::Failed);
    }

    #[test]
    fn snapshot_roundtrip() {
        let snapshot = StateSnapshot {
            form: None,
            agent_state: AgentState::with_input(AgentStatus::Failed, "make a survey"),
            is_complete: true,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"isComplete\":true"));
        assert!(json.contains("\"userInput\":\"make a survey\""));
        let parsed: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
