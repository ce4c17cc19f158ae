//! Session lifecycle endpoints.
//!
//! - POST `/login` - Issue a token pair and set session cookies
//! - POST `/refresh` - Exchange the refresh-token cookie for a new access token
//! - POST `/revoke` - Blacklist the caller's tracked refresh token
//! - POST `/logout` - Blacklist the presented tokens and clear cookies
//! - GET `/me` - Echo the authenticated identity
//! - GET `/health` - Liveness probe

use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::error::{ApiError, ResultExt};
use crate::AppState;
use crate::auth::{
    ACCESS_COOKIE_NAME, Identity, REFRESH_COOKIE_NAME, bearer_token, clear_cookie, get_cookie,
    session_cookie,
};
use crate::jwt::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS, TokenKind, TokenPayload};
use crate::permissions::Permission;
use crate::request_id::RequestId;

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    #[serde(rename = "userId", default)]
    user_id: String,
    email: Option<String>,
    #[serde(default = "default_roles")]
    roles: Vec<String>,
    #[serde(default = "default_permissions")]
    permissions: Vec<Permission>,
}

fn default_roles() -> Vec<String> {
    vec!["USER".to_string()]
}

fn default_permissions() -> Vec<Permission> {
    vec![Permission::Read]
}

pub(super) async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Issue an access/refresh pair for the posted identity and set both
/// session cookies.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("userId is required"));
    }

    info!(user_id = %user_id, roles = ?payload.roles, "Login attempt");

    let token_payload = TokenPayload {
        user_id: user_id.to_string(),
        email: payload.email,
        roles: payload.roles,
        permissions: payload.permissions,
    };

    let pair = state
        .tokens
        .generate_token_pair(&token_payload)
        .await
        .map_err(|e| {
            error!(error = %e, "Token generation failed");
            ApiError::internal("Login failed", Some(&request_id))
        })?;

    let access_cookie = session_cookie(
        ACCESS_COOKIE_NAME,
        &pair.access_token,
        ACCESS_TOKEN_TTL_SECS,
        state.secure_cookies,
    );
    let refresh_cookie = session_cookie(
        REFRESH_COOKIE_NAME,
        &pair.refresh_token,
        REFRESH_TOKEN_TTL_SECS,
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(json!({
            "message": "Login successful",
            "tokens": {
                "accessToken": pair.access_token,
                "refreshToken": pair.refresh_token,
            }
        })),
    ))
}

/// Exchange the refresh-token cookie for a new access-token cookie.
/// The refresh token itself is not rotated.
pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    let refresh_token = get_cookie(&parts.headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    if state.tokens.is_blacklisted(refresh_token).await {
        return Err(ApiError::unauthorized("Refresh token has been revoked"));
    }

    let access_token = state
        .tokens
        .rotate_access_token(refresh_token)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to mint replacement access token");
            ApiError::internal("Token refresh failed", Some(&request_id))
        })?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let access_cookie = session_cookie(
        ACCESS_COOKIE_NAME,
        &access_token,
        ACCESS_TOKEN_TTL_SECS,
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie)]),
        Json(json!({ "message": "Token refreshed", "accessToken": access_token })),
    ))
}

/// Blacklist the caller's tracked refresh token and drop the tracking
/// entry. Succeeds even when nothing was tracked.
pub(super) async fn revoke(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Extension(request_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .tokens
        .revoke_user_tokens(identity.user_id())
        .await
        .store_err("Token revocation failed", Some(&request_id))?;

    info!(user_id = %identity.user_id(), "Tokens revoked");
    Ok(Json(json!({ "message": "Tokens revoked" })))
}

/// Blacklist the presented tokens for their remaining class lifetime, then
/// clear both session cookies. A blacklist write failure is surfaced, not
/// swallowed: failing to revoke is a security-relevant error.
pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    let access_token =
        get_cookie(&parts.headers, ACCESS_COOKIE_NAME).or_else(|| bearer_token(&parts.headers));
    if let Some(token) = access_token {
        state
            .tokens
            .blacklist_token(token, TokenKind::Access)
            .await
            .store_err("Failed to blacklist access token", Some(&request_id))?;
    }

    if let Some(token) = get_cookie(&parts.headers, REFRESH_COOKIE_NAME) {
        state
            .tokens
            .blacklist_token(token, TokenKind::Refresh)
            .await
            .store_err("Failed to blacklist refresh token", Some(&request_id))?;
    }

    info!("User logged out");

    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies)),
        ]),
        Json(json!({ "message": "Logged out successfully" })),
    ))
}

/// Echo the authenticated identity.
pub(super) async fn me(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(json!({
        "user": {
            "id": identity.claims.user_id,
            "email": identity.claims.email,
            "roles": identity.claims.roles,
            "permissions": identity.claims.permissions,
        }
    }))
}
