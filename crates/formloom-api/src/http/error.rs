//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use formloom_types::error::{FormError, GuardViolation};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Form and version errors.
    Form(FormError),
    /// Authentication failure.
    Unauthorized(String),
    /// The caller does not own the resource.
    Forbidden(String),
    /// Request validation error.
    Validation(String),
    /// Resource state conflict.
    Conflict(String),
    /// Usage limit rejection, carried before any orchestration starts.
    LimitExceeded { current: u32, limit: u32 },
    /// Generic internal error.
    Internal(String),
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::Form(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Form(FormError::NotFound) => {
                (StatusCode::NOT_FOUND, "FORM_NOT_FOUND", "Form not found".to_string())
            }
            AppError::Form(FormError::VersionNotFound) => (
                StatusCode::NOT_FOUND,
                "VERSION_NOT_FOUND",
                "Form version not found".to_string(),
            ),
            AppError::Form(FormError::NoDraft) => (
                StatusCode::CONFLICT,
                "NO_DRAFT",
                "No draft version open for this form".to_string(),
            ),
            AppError::Form(FormError::Guard(violation)) => (
                StatusCode::CONFLICT,
                guard_code(violation),
                violation.to_string(),
            ),
            AppError::Form(FormError::LimitExceeded { current, limit }) => (
                StatusCode::TOO_MANY_REQUESTS,
                "LIMIT_EXCEEDED",
                format!("Usage limit exceeded: {current} of {limit} forms"),
            ),
            AppError::Form(FormError::InvalidQuestion(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Form(FormError::Generation(msg)) => (
                StatusCode::BAD_GATEWAY,
                "GENERATION_FAILED",
                msg.clone(),
            ),
            AppError::Form(FormError::Storage(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", msg.clone())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::LimitExceeded { current, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                "LIMIT_EXCEEDED",
                format!("Usage limit exceeded: {current} of {limit} forms"),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

fn guard_code(violation: &GuardViolation) -> &'static str {
    match violation {
        GuardViolation::QuestionCountChanged { .. } => "PUBLISHED_COUNT_LOCKED",
        GuardViolation::QuestionReordered { .. } => "PUBLISHED_ORDER_LOCKED",
        GuardViolation::QuestionTypeChanged { .. } => "PUBLISHED_TYPE_LOCKED",
    }
}
