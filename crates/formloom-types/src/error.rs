use thiserror::Error;

use crate::question::{InputType, SubmissionBehavior};

/// Errors related to form operations.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("form not found")]
    NotFound,

    #[error("form version not found")]
    VersionNotFound,

    #[error("no draft version open for this form")]
    NoDraft,

    #[error(transparent)]
    Guard(#[from] GuardViolation),

    #[error("usage limit exceeded: {current} of {limit} forms")]
    LimitExceeded { current: u32, limit: u32 },

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Structural violations rejected by the minor-update guard.
///
/// Display strings are user-facing and name the specific violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("Cannot add or remove questions on a published form.")]
    QuestionCountChanged { expected: usize, actual: usize },

    #[error(
        "Cannot reorder questions on a published form: expected '{expected_id}' at position {position}, got '{actual_id}'."
    )]
    QuestionReordered {
        position: usize,
        expected_id: String,
        actual_id: String,
    },

    #[error("Cannot change the type of question '{id}' on a published form ({expected} -> {actual}).")]
    QuestionTypeChanged {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Structural invariant violations found in a question definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    #[error("input type '{input_type}' is not allowed for question type '{question_type}'")]
    DisallowedInputType {
        question_type: &'static str,
        input_type: InputType,
    },

    #[error("submission behavior '{actual}' does not match '{expected}' expected for input type '{input_type}'")]
    BehaviorMismatch {
        input_type: InputType,
        expected: SubmissionBehavior,
        actual: SubmissionBehavior,
    },

    #[error("question '{question_id}' has no options")]
    EmptyOptions { question_id: String },

    #[error("invalid scale range: min {min} must be below max {max}")]
    InvalidRange { min: i32, max: i32 },
}

/// Errors from the event stream transport. Terminal: after the first
/// failed write the producer must stop emitting.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("event channel closed")]
    ChannelClosed,
}

/// Errors raised inside a tool executor. Caught at the step boundary and
/// converted into a structured failure result, never a turn abort.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: '{0}'")]
    UnknownTool(String),

    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("model error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors from repository operations (used by trait definitions in
/// formloom-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
