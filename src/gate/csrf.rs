//! CSRF guard: double-submit cookie backed by server-side tokens.
//!
//! GET requests get a fresh token, stored with a 24-hour TTL and set as a
//! script-readable cookie. Unsafe methods must echo a known token via the
//! `X-XSRF-TOKEN` header or a top-level `_csrf` JSON body field; validity
//! is decided by store existence, not by comparing against the request's
//! cookie. Never fails open.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::Method,
    response::IntoResponse,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::AppState;
use crate::api::error::ApiError;
use crate::auth::csrf_cookie;
use crate::request_id::RequestId;

use super::{ResponseEffects, StepOutcome};

/// CSRF tokens live for 24 hours.
const CSRF_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Largest body the guard will buffer while looking for `_csrf`.
const MAX_PROBED_BODY_BYTES: usize = 64 * 1024;

pub(super) async fn run(
    state: &AppState,
    req: &mut Request,
    effects: &mut ResponseEffects,
) -> StepOutcome {
    if req.method() == Method::GET {
        return issue_token(state, req, effects).await;
    }
    validate_token(state, req).await
}

async fn issue_token(
    state: &AppState,
    req: &mut Request,
    effects: &mut ResponseEffects,
) -> StepOutcome {
    let token = Uuid::new_v4().to_string();

    if let Err(e) = state.store.csrf_tokens().put(&token, CSRF_TOKEN_TTL_SECS).await {
        error!(error = %e, "Failed to store CSRF token");
        let request_id = req.extensions().get::<RequestId>();
        return StepOutcome::Terminate(
            ApiError::internal("Internal Server Error", request_id).into_response(),
        );
    }

    effects.set_cookie(&csrf_cookie(&token, CSRF_TOKEN_TTL_SECS, state.secure_cookies));
    StepOutcome::Continue
}

async fn validate_token(state: &AppState, req: &mut Request) -> StepOutcome {
    let token = match header_token(req) {
        Some(token) => Some(token),
        None => body_token(req).await,
    };

    let valid = match token {
        Some(ref token) => match state.store.csrf_tokens().contains(token).await {
            Ok(valid) => valid,
            Err(e) => {
                // Fail secure; the client remedy is the same as for an
                // unknown token (fetch a fresh one via a GET).
                error!(error = %e, "CSRF store lookup failed, rejecting request");
                false
            }
        },
        None => false,
    };

    if valid {
        StepOutcome::Continue
    } else {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "CSRF validation failed"
        );
        StepOutcome::Terminate(ApiError::forbidden("Invalid CSRF token").into_response())
    }
}

fn header_token(req: &Request) -> Option<String> {
    req.headers()
        .get("x-xsrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Look for a top-level `_csrf` string field in a JSON body, restoring the
/// body for downstream extractors.
async fn body_token(req: &mut Request) -> Option<String> {
    let content_type = req
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/json") {
        return None;
    }

    let body = std::mem::replace(req.body_mut(), Body::empty());
    let bytes = to_bytes(body, MAX_PROBED_BODY_BYTES).await.ok()?;

    let token = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|value| value.get("_csrf").and_then(|t| t.as_str()).map(str::to_string));

    *req.body_mut() = Body::from(bytes);
    token
}
