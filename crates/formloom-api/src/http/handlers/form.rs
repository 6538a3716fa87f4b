//! Form endpoints: AI-driven creation, minor updates, and reads.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use formloom_core::repository::{FormRepository, UsageLimiter};
use formloom_core::service::MinorUpdatePayload;

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::response::success;
use crate::state::AppState;

/// Request body for AI-driven form creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCreateRequest {
    /// Natural-language description of the form to build.
    pub prompt: String,
}

/// POST /api/v1/forms/{id} — create a form from a prompt (not streamed).
///
/// Runs the same createForm pipeline as the chat agent, but drains the
/// progress events and returns only the final form and version ids.
pub async fn create_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AiCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt must not be empty".to_string()));
    }

    if state
        .form_repo
        .get_form(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .is_some()
    {
        return Err(AppError::Conflict(format!("Form '{id}' already exists")));
    }

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

    let (form_id, version_id) = state
        .form_service
        .ai_create(&*state.model, &state.config, &user, id, &body.prompt)
        .await?;

    Ok(success(serde_json::json!({
        "formId": form_id,
        "versionId": version_id,
    })))
}

/// PATCH /api/v1/forms/{id} — content-only update.
///
/// With an open draft the changes land on the draft; on a published-only
/// form the minor-update guard enforces the frozen schema and structural
/// violations come back as 409 with the violation message.
pub async fn update_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MinorUpdatePayload>,
) -> Result<impl IntoResponse, AppError> {
    let form = state.form_service.get_form(&id).await?;
    if form.owner_id != user.user_id {
        return Err(AppError::Forbidden(
            "Only the form owner can update it".to_string(),
        ));
    }

    let version = state.form_service.minor_update(&id, payload).await?;
    Ok(success(version))
}

/// GET /api/v1/forms/{id} — published version if present, else draft.
pub async fn get_form(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let version = state.form_service.get_current_view(&id).await?;
    Ok(success(version))
}
