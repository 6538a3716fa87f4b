//! Mailbox wrapper around the reducer.
//!
//! Owns a [`ClientState`] inside a spawned task. Events and connection
//! changes arrive over an mpsc channel; every applied change publishes the
//! new state on a watch channel. Consumers read a cheap clone of the
//! latest state and never touch shared mutable data.

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use formloom_types::event::AgentEvent;

use super::{ClientState, connect, reduce};

enum Command {
    Event(AgentEvent),
    Connect(Uuid),
}

/// Handle to a reducer task.
///
/// Dropping the handle closes the command channel and ends the task.
pub struct ReducerMailbox {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ClientState>,
}

impl ReducerMailbox {
    /// Spawn a reducer task starting from the given state.
    pub fn spawn(initial: ClientState) -> Self {
        let (commands, mut command_rx) = mpsc::channel::<Command>(64);
        let (state_tx, state) = watch::channel(initial.clone());

        tokio::spawn(async move {
            let mut current = initial;
            while let Some(command) = command_rx.recv().await {
                current = match command {
                    Command::Event(event) => reduce(current, &event),
                    Command::Connect(form_id) => connect(current, form_id),
                };
                // Receivers may all be gone; the task ends on the next
                // closed command channel anyway.
                let _ = state_tx.send(current.clone());
            }
        });

        Self { commands, state }
    }

    /// Bind the session to a form (see [`connect`]).
    pub async fn connect(&self, form_id: Uuid) -> Result<(), MailboxClosed> {
        self.commands
            .send(Command::Connect(form_id))
            .await
            .map_err(|_| MailboxClosed)
    }

    /// Feed one event through the reducer.
    pub async fn apply(&self, event: AgentEvent) -> Result<(), MailboxClosed> {
        self.commands
            .send(Command::Event(event))
            .await
            .map_err(|_| MailboxClosed)
    }

    /// The latest published state.
    pub fn state(&self) -> ClientState {
        self.state.borrow().clone()
    }

    /// Wait until the reducer has applied a change, then return the state.
    pub async fn changed(&mut self) -> Result<ClientState, MailboxClosed> {
        self.state.changed().await.map_err(|_| MailboxClosed)?;
        Ok(self.state.borrow().clone())
    }
}

/// The reducer task has ended.
#[derive(Debug, thiserror::Error)]
#[error("reducer mailbox closed")]
pub struct MailboxClosed;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use formloom_types::event::EventPayload;

    fn task_completed(form_id: Uuid, sequence: u64) -> AgentEvent {
        AgentEvent {
            id: Uuid::now_v7(),
            form_id,
            user_id: "user-1".to_string(),
            sequence,
            timestamp: Utc::now(),
            payload: EventPayload::TaskCompleted {
                task_id: format!("t{sequence}"),
                label: "Question".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn mailbox_applies_events_in_order() {
        let form_id = Uuid::now_v7();
        let mut mailbox = ReducerMailbox::spawn(ClientState::default());
        mailbox.connect(form_id).await.unwrap();
        let _ = mailbox.changed().await.unwrap();

        mailbox.apply(task_completed(form_id, 1)).await.unwrap();
        mailbox.apply(task_completed(form_id, 2)).await.unwrap();
        mailbox.apply(task_completed(form_id, 3)).await.unwrap();

        // Wait until all three have landed.
        let mut state = mailbox.state();
        while state.completed_tasks < 3 {
            state = mailbox.changed().await.unwrap();
        }
        assert_eq!(state.completed_tasks, 3);
        assert_eq!(state.event_log.len(), 3);
    }

    #[tokio::test]
    async fn connect_resets_through_mailbox() {
        let form_a = Uuid::now_v7();
        let form_b = Uuid::now_v7();
        let mut mailbox = ReducerMailbox::spawn(ClientState::default());

        mailbox.connect(form_a).await.unwrap();
        let _ = mailbox.changed().await.unwrap();
        mailbox.apply(task_completed(form_a, 1)).await.unwrap();
        let mut state = mailbox.state();
        while state.completed_tasks < 1 {
            state = mailbox.changed().await.unwrap();
        }

        mailbox.connect(form_b).await.unwrap();
        let mut state = mailbox.state();
        while state.form_id != Some(form_b) {
            state = mailbox.changed().await.unwrap();
        }
        assert_eq!(state.completed_tasks, 0);
        assert!(state.event_log.is_empty());
    }
}
