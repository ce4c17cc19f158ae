//! Sample protected resources demonstrating gate configurations.

use axum::{Extension, Json, response::IntoResponse};
use serde_json::json;

use crate::auth::Identity;

/// Requires `ADMIN_ACCESS`.
pub(super) async fn admin(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(json!({ "message": "Admin endpoint", "userId": identity.user_id() }))
}

/// Authenticated and rate limited.
pub(super) async fn limited() -> impl IntoResponse {
    Json(json!({ "message": "Rate limited endpoint" }))
}

/// Full pipeline: read access, rate limit, CSRF guard.
pub(super) async fn data_index() -> impl IntoResponse {
    Json(json!({ "message": "OK" }))
}

/// Mutating counterpart of `data_index`; reachable only with a valid CSRF
/// token.
pub(super) async fn data_create() -> impl IntoResponse {
    Json(json!({ "message": "Created" }))
}
