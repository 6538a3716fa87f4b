//! Client state reducer.
//!
//! Consumers of the event feed derive their view of the world through a
//! pure `reduce` function over an owned [`ClientState`] value. There is no
//! shared mutable store: concurrent access goes through the mailbox in
//! [`mailbox`], which owns the state in a task and publishes read-only
//! copies over a watch channel.

pub mod mailbox;

use uuid::Uuid;

use formloom_types::agent::AgentState;
use formloom_types::event::{AgentEvent, EventPayload};
use formloom_types::form::FormSnapshot;

/// Where the session is in its (re)initialization state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No session bound yet.
    #[default]
    Idle,
    /// Reconnecting to the form already bound; accumulated state retained.
    ConnectingSameForm,
    /// Binding to a different form; all prior state was discarded.
    ConnectingNewForm,
}

/// The client-side projection derived from the event feed.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    /// The form this session is bound to. Snapshots for any other form
    /// are ignored (cross-session leakage guard).
    pub form_id: Option<Uuid>,
    pub connection: ConnectionPhase,
    pub current_form: Option<FormSnapshot>,
    pub agent_state: Option<AgentState>,
    /// Authoritative total, adopted from the planning marker.
    pub total_tasks: u32,
    /// Incremented per `task_completed`; not deduplicated by task id, so
    /// a redelivered event counts again.
    pub completed_tasks: u32,
    pub current_task: Option<String>,
    pub last_error: Option<String>,
    /// Section the UI should surface a configuration affordance for.
    pub config_prompt: Option<String>,
    /// Events applied to this state, oldest first.
    pub event_log: Vec<AgentEvent>,
}

/// Bind the session to a form, deciding between retention and reset.
///
/// If the requested form differs from the previously bound id, or the
/// cached form content belongs to a different form (stale-data guard),
/// every piece of accumulated state is discarded and the session starts
/// fresh. Otherwise the event log survives and only the connection phase
/// refreshes.
pub fn connect(state: ClientState, requested_form_id: Uuid) -> ClientState {
    let same_binding = state.form_id == Some(requested_form_id);
    let cache_fresh = state
        .current_form
        .as_ref()
        .is_none_or(|form| form.form_id == requested_form_id);

    if same_binding && cache_fresh {
        ClientState {
            connection: ConnectionPhase::ConnectingSameForm,
            ..state
        }
    } else {
        ClientState {
            form_id: Some(requested_form_id),
            connection: ConnectionPhase::ConnectingNewForm,
            ..ClientState::default()
        }
    }
}

/// Apply one event to the state, returning the next state.
///
/// Pure: no I/O, no clock, no shared mutation. Matching on the payload is
/// exhaustive -- a new event type is a compile error here, not a silent
/// fallthrough.
pub fn reduce(mut state: ClientState, event: &AgentEvent) -> ClientState {
    match &event.payload {
        EventPayload::StateSnapshot(snapshot) => {
            // Last-write-wins full replace, gated on the bound form id.
            if state.form_id == Some(event.form_id) {
                state.current_form = snapshot.form.clone();
                state.agent_state = Some(snapshot.agent_state.clone());
                state.event_log.push(event.clone());
            }
            state
        }

        EventPayload::TaskStarted { label, .. } => {
            state.current_task = Some(label.clone());
            state.event_log.push(event.clone());
            state
        }

        EventPayload::TaskCompleted { .. } => {
            state.completed_tasks += 1;
            state.event_log.push(event.clone());
            state
        }

        EventPayload::ToolError { message, .. }
        | EventPayload::GenerationError { message } => {
            // Errors are recorded but never clear the current form.
            state.last_error = Some(message.clone());
            state.event_log.push(event.clone());
            state
        }

        EventPayload::AgentInitialized => {
            // A fresh generation run: task accounting starts over.
            state.total_tasks = 0;
            state.completed_tasks = 0;
            state.current_task = None;
            state.event_log.push(event.clone());
            state
        }

        EventPayload::AgentWarning { planned_tasks, .. } => {
            if let Some(total) = planned_tasks {
                // Planning marker: the reported total is authoritative.
                state.total_tasks = *total;
            }
            state.event_log.push(event.clone());
            state
        }

        EventPayload::ShowConfigButton { section } => {
            state.config_prompt = Some(section.clone());
            state.event_log.push(event.clone());
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formloom_types::agent::{AgentStatus, StateSnapshot};
    use formloom_types::form::FormSettings;

    fn event(form_id: Uuid, sequence: u64, payload: EventPayload) -> AgentEvent {
        AgentEvent {
            id: Uuid::now_v7(),
            form_id,
            user_id: "user-1".to_string(),
            sequence,
            timestamp: Utc::now(),
            payload,
        }
    }

    fn snapshot_for(form_id: Uuid, title: &str) -> EventPayload {
        EventPayload::StateSnapshot(StateSnapshot {
            form: Some(FormSnapshot {
                form_id,
                version_id: Uuid::now_v7(),
                title: title.to_string(),
                description: None,
                questions: vec![],
                settings: FormSettings::new(),
            }),
            agent_state: AgentState::new(AgentStatus::Running),
            is_complete: false,
        })
    }

    #[test]
    fn snapshot_replaces_form_and_agent_state() {
        let form_id = Uuid::now_v7();
        let state = connect(ClientState::default(), form_id);

        let state = reduce(state, &event(form_id, 1, snapshot_for(form_id, "Survey")));
        assert_eq!(state.current_form.as_ref().unwrap().title, "Survey");
        assert_eq!(
            state.agent_state.as_ref().unwrap().status,
            AgentStatus::Running
        );
    }

    #[test]
    fn applying_the_same_snapshot_twice_is_idempotent() {
        let form_id = Uuid::now_v7();
        let state = connect(ClientState::default(), form_id);
        let snapshot_event = event(form_id, 1, snapshot_for(form_id, "Survey"));

        let once = reduce(state, &snapshot_event);
        let twice = reduce(once.clone(), &snapshot_event);

        assert_eq!(once.current_form, twice.current_form);
        assert_eq!(once.agent_state, twice.agent_state);
        assert_eq!(once.completed_tasks, twice.completed_tasks);
    }

    #[test]
    fn foreign_form_snapshot_is_ignored() {
        let form_a = Uuid::now_v7();
        let form_b = Uuid::now_v7();
        let state = connect(ClientState::default(), form_a);
        let state = reduce(state, &event(form_a, 1, snapshot_for(form_a, "Form A")));

        // A snapshot for form B arrives on the same feed.
        let state = reduce(state, &event(form_b, 2, snapshot_for(form_b, "Form B")));

        assert_eq!(state.current_form.as_ref().unwrap().title, "Form A");
        assert_eq!(state.current_form.as_ref().unwrap().form_id, form_a);
    }

    #[test]
    fn task_completed_increments_without_dedup() {
        let form_id = Uuid::now_v7();
        let mut state = connect(ClientState::default(), form_id);

        let completed = EventPayload::TaskCompleted {
            task_id: "t1".to_string(),
            label: "Question 1".to_string(),
        };
        // The same task id delivered twice double-counts; the counter has
        // no memory of task ids.
        state = reduce(state, &event(form_id, 1, completed.clone()));
        state = reduce(state, &event(form_id, 2, completed));
        assert_eq!(state.completed_tasks, 2);
    }

    #[test]
    fn error_records_detail_but_keeps_form() {
        let form_id = Uuid::now_v7();
        let state = connect(ClientState::default(), form_id);
        let state = reduce(state, &event(form_id, 1, snapshot_for(form_id, "Survey")));

        let state = reduce(
            state,
            &event(
                form_id,
                2,
                EventPayload::ToolError {
                    tool: "createForm".to_string(),
                    message: "store unavailable".to_string(),
                },
            ),
        );

        assert_eq!(state.last_error.as_deref(), Some("store unavailable"));
        assert!(state.current_form.is_some());
    }

    #[test]
    fn agent_initialized_resets_counters() {
        let form_id = Uuid::now_v7();
        let mut state = connect(ClientState::default(), form_id);
        state.total_tasks = 4;
        state.completed_tasks = 4;
        state.current_task = Some("old".to_string());

        let state = reduce(state, &event(form_id, 1, EventPayload::AgentInitialized));
        assert_eq!(state.total_tasks, 0);
        assert_eq!(state.completed_tasks, 0);
        assert!(state.current_task.is_none());
    }

    #[test]
    fn planning_marker_sets_authoritative_total() {
        let form_id = Uuid::now_v7();
        let state = connect(ClientState::default(), form_id);

        let state = reduce(
            state,
            &event(
                form_id,
                1,
                EventPayload::AgentWarning {
                    message: "planned 6 questions".to_string(),
                    planned_tasks: Some(6),
                },
            ),
        );
        assert_eq!(state.total_tasks, 6);

        // A warning without the marker leaves the total alone.
        let state = reduce(
            state,
            &event(
                form_id,
                2,
                EventPayload::AgentWarning {
                    message: "slow model".to_string(),
                    planned_tasks: None,
                },
            ),
        );
        assert_eq!(state.total_tasks, 6);
    }

    #[test]
    fn connect_same_form_retains_event_log() {
        let form_id = Uuid::now_v7();
        let mut state = connect(ClientState::default(), form_id);
        state = reduce(state, &event(form_id, 1, snapshot_for(form_id, "Survey")));
        assert_eq!(state.event_log.len(), 1);

        let state = connect(state, form_id);
        assert_eq!(state.connection, ConnectionPhase::ConnectingSameForm);
        assert_eq!(state.event_log.len(), 1);
        assert!(state.current_form.is_some());
    }

    #[test]
    fn connect_new_form_discards_everything() {
        let form_a = Uuid::now_v7();
        let form_b = Uuid::now_v7();
        let mut state = connect(ClientState::default(), form_a);
        state = reduce(state, &event(form_a, 1, snapshot_for(form_a, "Form A")));

        let state = connect(state, form_b);
        assert_eq!(state.connection, ConnectionPhase::ConnectingNewForm);
        assert_eq!(state.form_id, Some(form_b));
        assert!(state.current_form.is_none());
        assert!(state.event_log.is_empty());
        assert_eq!(state.completed_tasks, 0);
    }

    #[test]
    fn connect_discards_on_stale_cached_form() {
        let form_a = Uuid::now_v7();
        let form_b = Uuid::now_v7();

        // Session claims to be bound to A but somehow caches B's content.
        let mut state = connect(ClientState::default(), form_a);
        state.current_form = Some(FormSnapshot {
            form_id: form_b,
            version_id: Uuid::now_v7(),
            title: "Stale".to_string(),
            description: None,
            questions: vec![],
            settings: FormSettings::new(),
        });

        let state = connect(state, form_a);
        assert_eq!(state.connection, ConnectionPhase::ConnectingNewForm);
        assert!(state.current_form.is_none());
    }

    #[test]
    fn show_config_button_sets_prompt() {
        let form_id = Uuid::now_v7();
        let state = connect(ClientState::default(), form_id);
        let state = reduce(
            state,
            &event(
                form_id,
                1,
                EventPayload::ShowConfigButton {
                    section: "notifications".to_string(),
                },
            ),
        );
        assert_eq!(state.config_prompt.as_deref(), Some("notifications"));
    }
}
