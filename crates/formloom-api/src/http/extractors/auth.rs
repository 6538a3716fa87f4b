//! Caller identity extractor.
//!
//! The authentication collaborators contract: every request resolves to a
//! `{user_id, is_guest}` pair before any work happens.
//!
//! - `Authorization: Bearer <key>` or `X-API-Key: <key>`: the key is
//!   SHA-256 hashed and looked up in the `api_keys` table; a hit yields a
//!   member identity.
//! - `X-Guest-Id: <id>`: a guest identity (no key required).
//! - Neither: 401 before any orchestration, producing no partial state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use sqlx::Row;

use formloom_types::identity::AuthUser;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated (or guest) caller. Extracting this resolves identity.
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(api_key) = extract_api_key(parts)? {
            let key_hash = hash_api_key(&api_key);

            let result = sqlx::query("SELECT id, user_id FROM api_keys WHERE key_hash = ?")
                .bind(&key_hash)
                .fetch_optional(&state.db_pool.reader)
                .await
                .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

            return match result {
                Some(row) => {
                    // Update last_used_at (best effort, don't fail the request)
                    let id: String = row.get("id");
                    let user_id: String = row.get("user_id");
                    let now = chrono::Utc::now().to_rfc3339();
                    let _ = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
                        .bind(&now)
                        .bind(&id)
                        .execute(&state.db_pool.writer)
                        .await;
                    Ok(CurrentUser(AuthUser::member(user_id)))
                }
                None => Err(AppError::Unauthorized("Invalid API key.".to_string())),
            };
        }

        if let Some(guest_id) = parts.headers.get("x-guest-id") {
            let guest_id = guest_id
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid X-Guest-Id encoding".to_string()))?
                .trim();
            if guest_id.is_empty() {
                return Err(AppError::Unauthorized("Empty X-Guest-Id".to_string()));
            }
            return Ok(CurrentUser(AuthUser::guest(format!("guest:{guest_id}"))));
        }

        Err(AppError::Unauthorized(
            "Missing credentials. Provide 'Authorization: Bearer <key>', 'X-API-Key: <key>', \
             or 'X-Guest-Id: <id>'."
                .to_string(),
        ))
    }
}

/// Extract an API key from request headers, if one was sent.
fn extract_api_key(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(key.trim().to_string()));
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-API-Key header encoding".to_string()))?;
        return Ok(Some(key_str.trim().to_string()));
    }

    Ok(None)
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Create an API key for a user and store its hash.
///
/// Returns the plaintext key; it is shown once and only the hash is kept.
pub async fn create_api_key(
    pool: &formloom_infra::sqlite::pool::DatabasePool,
    user_id: &str,
    name: &str,
) -> anyhow::Result<String> {
    let plaintext_key = format!(
        "floom_{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    let key_hash = hash_api_key(&plaintext_key);
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO api_keys (id, key_hash, user_id, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&key_hash)
    .bind(user_id)
    .bind(name)
    .bind(&now)
    .execute(&pool.writer)
    .await?;

    Ok(plaintext_key)
}
