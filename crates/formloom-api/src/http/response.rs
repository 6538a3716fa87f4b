//! Success envelope for API responses.
//!
//! Every JSON response uses `{data, meta, errors}`; errors use the same
//! shape with `data: null` (see `error.rs`).

use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Wrap payload data in the standard envelope.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({
        "data": data,
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
        },
        "errors": [],
    }))
}
