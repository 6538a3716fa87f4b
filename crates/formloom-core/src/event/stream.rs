//! Bounded per-session event channel with sequence stamping.
//!
//! One orchestrator turn is the single writer for a session; the HTTP
//! layer drains the receiving end into the client's response stream.
//! Channel capacity provides natural backpressure: a slow consumer slows
//! the producer instead of growing an unbounded buffer.
//!
//! A send into a closed channel (client gone) is a terminal
//! `TransportError`: the producer must stop emitting, while the caller
//! still best-effort persists whatever partial results exist server-side.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use formloom_types::error::TransportError;
use formloom_types::event::{AgentEvent, EventPayload};

/// Create the event channel for one session.
///
/// Returns the emitter handed to the orchestrator and the receiver drained
/// by the transport layer.
pub fn session_channel(
    capacity: usize,
    form_id: Uuid,
    user_id: impl Into<String>,
) -> (EventEmitter, mpsc::Receiver<AgentEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    let emitter = EventEmitter {
        tx,
        form_id,
        user_id: user_id.into(),
        sequence: Arc::new(AtomicU64::new(0)),
    };
    (emitter, rx)
}

/// Stamps session metadata and a strictly increasing sequence number on
/// every emitted event.
///
/// Clones share the sequence counter, so monotonicity holds across all
/// handles for a session.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<AgentEvent>,
    form_id: Uuid,
    user_id: String,
    sequence: Arc<AtomicU64>,
}

impl EventEmitter {
    /// The form this session is bound to.
    pub fn form_id(&self) -> Uuid {
        self.form_id
    }

    /// Emit one event, waiting for channel capacity.
    ///
    /// Sequence numbers start at 1 and increase by exactly one per emitted
    /// event. A closed channel yields [`TransportError::ChannelClosed`];
    /// callers must treat that as terminal and cease emission.
    pub async fn emit(&self, payload: EventPayload) -> Result<(), TransportError> {
        let event = AgentEvent {
            id: Uuid::now_v7(),
            form_id: self.form_id,
            user_id: self.user_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: Utc::now(),
            payload,
        };

        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Whether the consuming side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("form_id", &self.form_id)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_strictly_increases() {
        let (emitter, mut rx) = session_channel(16, Uuid::now_v7(), "user-1");

        for _ in 0..5 {
            emitter.emit(EventPayload::AgentInitialized).await.unwrap();
        }
        drop(emitter);

        let mut last = 0u64;
        while let Some(event) = rx.recv().await {
            assert!(event.sequence > last, "sequence must strictly increase");
            last = event.sequence;
        }
        assert_eq!(last, 5);
    }

    #[tokio::test]
    async fn clones_share_the_sequence_counter() {
        let (emitter, mut rx) = session_channel(16, Uuid::now_v7(), "user-1");
        let clone = emitter.clone();

        emitter.emit(EventPayload::AgentInitialized).await.unwrap();
        clone.emit(EventPayload::AgentInitialized).await.unwrap();
        emitter.emit(EventPayload::AgentInitialized).await.unwrap();

        let sequences: Vec<u64> = [
            rx.recv().await.unwrap().sequence,
            rx.recv().await.unwrap().sequence,
            rx.recv().await.unwrap().sequence,
        ]
        .to_vec();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn events_carry_session_metadata() {
        let form_id = Uuid::now_v7();
        let (emitter, mut rx) = session_channel(16, form_id, "user-7");

        emitter
            .emit(EventPayload::AgentWarning {
                message: "planning".to_string(),
                planned_tasks: Some(3),
            })
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.form_id, form_id);
        assert_eq!(event.user_id, "user-7");
    }

    #[tokio::test]
    async fn send_after_close_is_terminal() {
        let (emitter, rx) = session_channel(16, Uuid::now_v7(), "user-1");
        drop(rx);

        assert!(emitter.is_closed());
        let err = emitter.emit(EventPayload::AgentInitialized).await.unwrap_err();
        assert!(matches!(err, TransportError::ChannelClosed));
    }

    #[tokio::test]
    async fn delivery_preserves_emission_order() {
        let (emitter, mut rx) = session_channel(16, Uuid::now_v7(), "user-1");

        for i in 0..4u32 {
            emitter
                .emit(EventPayload::TaskCompleted {
                    task_id: format!("t{i}"),
                    label: format!("Task {i}"),
                })
                .await
                .unwrap();
        }

        for i in 0..4u32 {
            let event = rx.recv().await.unwrap();
            match event.payload {
                EventPayload::TaskCompleted { task_id, .. } => {
                    assert_eq!(task_id, format!("t{i}"));
                }
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }
}
