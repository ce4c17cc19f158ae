//! Rate-limiting step: fixed window per client IP.
//!
//! One atomic store increment per request; the first hit in a window pins
//! the window end, so a burst straddling the boundary can briefly exceed
//! the limit (fixed window, not sliding). Fails open on store errors:
//! availability wins here, unlike the blacklist check.

use axum::{extract::Request, http::HeaderName, response::IntoResponse};
use tracing::warn;

use crate::AppState;
use crate::api::error::ApiError;
use crate::auth::extract_client_ip;

use super::{ResponseEffects, StepOutcome};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rate limiter configuration: `max` requests per `window_secs` per client.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub max: i64,
}

impl Default for RateLimitSettings {
    /// 100 requests per 15 minutes.
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max: 100,
        }
    }
}

pub(super) async fn run(
    state: &AppState,
    req: &mut Request,
    effects: &mut ResponseEffects,
) -> StepOutcome {
    let limits = state.rate_limit;
    let key = extract_client_ip(req).unwrap_or_else(|| "unknown".to_string());

    let count = match state
        .store
        .rate_counters()
        .increment(&key, limits.window_secs)
        .await
    {
        Ok(count) => count,
        Err(e) => {
            // Fail open: an unreachable store must not block all traffic.
            warn!(error = %e, "Rate limit store error, allowing request");
            return StepOutcome::Continue;
        }
    };

    if count > limits.max {
        warn!(ip = %key, "Rate limit exceeded");
        return StepOutcome::Terminate(
            ApiError::rate_limited(limits.window_secs).into_response(),
        );
    }

    effects.header(LIMIT_HEADER, limits.max.to_string());
    effects.header(REMAINING_HEADER, (limits.max - count).max(0).to_string());
    StepOutcome::Continue
}
