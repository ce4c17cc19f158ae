//! Authentication step.
//!
//! Token sources, in order: `accessToken` cookie, then `Authorization:
//! Bearer`. A request with no access token may still authenticate through
//! its `refreshToken` cookie, which mints a replacement access token and
//! sets it on the response.
//!
//! Credential failures answer 401; only unexpected internal failures (a
//! signing error while rotating) answer 500. Blacklist lookups fail secure.

use axum::{extract::Request, response::IntoResponse};
use tracing::{debug, error};

use crate::AppState;
use crate::api::error::ApiError;
use crate::auth::{
    ACCESS_COOKIE_NAME, Identity, REFRESH_COOKIE_NAME, bearer_token, get_cookie, session_cookie,
};
use crate::jwt::ACCESS_TOKEN_TTL_SECS;
use crate::request_id::RequestId;

use super::{ResponseEffects, StepOutcome};

enum AuthFailure {
    /// A token was presented and did not check out.
    InvalidToken,
    /// No usable credentials on the request.
    NotAuthenticated,
    /// Something broke that is not the client's fault.
    Internal,
}

pub(super) async fn run(
    state: &AppState,
    req: &mut Request,
    effects: &mut ResponseEffects,
) -> StepOutcome {
    match try_authenticate(state, req, effects).await {
        Ok(identity) => {
            debug!(user_id = %identity.user_id(), "Authentication successful");
            req.extensions_mut().insert(identity);
            StepOutcome::Continue
        }
        Err(AuthFailure::InvalidToken) => {
            StepOutcome::Terminate(ApiError::unauthorized("Invalid token").into_response())
        }
        Err(AuthFailure::NotAuthenticated) => StepOutcome::Terminate(
            ApiError::unauthorized("Please login to continue").into_response(),
        ),
        Err(AuthFailure::Internal) => {
            let request_id = req.extensions().get::<RequestId>();
            StepOutcome::Terminate(
                ApiError::internal("Authentication failed", request_id).into_response(),
            )
        }
    }
}

async fn try_authenticate(
    state: &AppState,
    req: &mut Request,
    effects: &mut ResponseEffects,
) -> Result<Identity, AuthFailure> {
    // Access token: cookie takes precedence over the Authorization header.
    let access_token = get_cookie(req.headers(), ACCESS_COOKIE_NAME)
        .or_else(|| bearer_token(req.headers()))
        .map(str::to_string);

    if let Some(token) = access_token {
        if state.tokens.is_blacklisted(&token).await {
            return Err(AuthFailure::InvalidToken);
        }
        let claims = state
            .tokens
            .verify_access_token(&token)
            .await
            .ok_or(AuthFailure::InvalidToken)?;
        return Ok(Identity { claims });
    }

    // No access token: fall back to the refresh token (cookie only).
    let refresh_token =
        get_cookie(req.headers(), REFRESH_COOKIE_NAME).ok_or(AuthFailure::NotAuthenticated)?;

    if state.tokens.is_blacklisted(refresh_token).await {
        return Err(AuthFailure::NotAuthenticated);
    }

    let new_access = state
        .tokens
        .rotate_access_token(refresh_token)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to mint replacement access token");
            AuthFailure::Internal
        })?
        .ok_or(AuthFailure::NotAuthenticated)?;

    effects.set_cookie(&session_cookie(
        ACCESS_COOKIE_NAME,
        &new_access,
        ACCESS_TOKEN_TTL_SECS,
        state.secure_cookies,
    ));

    let claims = state
        .tokens
        .verify_access_token(&new_access)
        .await
        .ok_or(AuthFailure::NotAuthenticated)?;

    Ok(Identity { claims })
}
