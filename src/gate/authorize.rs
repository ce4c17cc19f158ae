//! Authorization step: AND semantics over required permissions.

use std::collections::BTreeSet;

use axum::{extract::Request, response::IntoResponse};
use tracing::warn;

use crate::AppState;
use crate::api::error::ApiError;
use crate::auth::Identity;
use crate::permissions::Permission;

use super::StepOutcome;

pub(super) fn run(
    state: &AppState,
    req: &Request,
    required: &BTreeSet<Permission>,
) -> StepOutcome {
    // Authorization without authentication is a pipeline configuration
    // error, not a credential error, but the client still gets a 401.
    let Some(identity) = req.extensions().get::<Identity>() else {
        warn!("Authorization step ran without an authenticated identity");
        return StepOutcome::Terminate(ApiError::unauthorized("Unauthorized").into_response());
    };

    let effective = state
        .roles
        .effective_permissions(&identity.claims.roles, &identity.claims.permissions);

    if required.iter().all(|p| effective.contains(p)) {
        StepOutcome::Continue
    } else {
        warn!(
            user_id = %identity.user_id(),
            required = ?required,
            actual = ?effective,
            "Insufficient permissions"
        );
        StepOutcome::Terminate(ApiError::forbidden("Insufficient permissions").into_response())
    }
}
