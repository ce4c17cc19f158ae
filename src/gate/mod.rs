//! Request-gating pipeline.
//!
//! A protected route carries an ordered list of steps. Each step either
//! lets the request continue or terminates it with a response; a later step
//! never runs once an earlier one has terminated. The runner is a single
//! axum middleware, so a route opts in with
//! `middleware::from_fn_with_state(pipeline.into_gate(state), gate::run)`.
//!
//! Steps that need to touch the eventual response (new access-token cookie,
//! CSRF cookie, rate-limit headers) record those as effects, applied after
//! the handler, or to the terminating response, so a refreshed cookie
//! survives a downstream denial.

mod authenticate;
mod authorize;
mod csrf;
mod rate_limit;

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::permissions::Permission;

pub use rate_limit::RateLimitSettings;

/// Outcome of a single pipeline step.
pub enum StepOutcome {
    /// Proceed to the next step, or to the handler.
    Continue,
    /// Stop the pipeline and answer immediately.
    Terminate(Response),
}

/// A single gating step.
#[derive(Debug, Clone)]
pub enum Step {
    Authenticate,
    Authorize(BTreeSet<Permission>),
    RateLimit,
    Csrf,
}

/// Ordered list of steps applied to a route.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the authentication step.
    pub fn authenticate(mut self) -> Self {
        self.steps.push(Step::Authenticate);
        self
    }

    /// Append an authorization step requiring every listed permission.
    pub fn authorize<I>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.steps
            .push(Step::Authorize(required.into_iter().collect()));
        self
    }

    /// Append the rate-limiting step.
    pub fn rate_limit(mut self) -> Self {
        self.steps.push(Step::RateLimit);
        self
    }

    /// Append the CSRF guard.
    pub fn csrf(mut self) -> Self {
        self.steps.push(Step::Csrf);
        self
    }

    /// Bind the pipeline to application state for use as middleware state.
    pub fn into_gate(self, state: AppState) -> Gate {
        Gate {
            state,
            steps: Arc::new(self.steps),
        }
    }
}

/// A pipeline bound to application state.
#[derive(Clone)]
pub struct Gate {
    state: AppState,
    steps: Arc<Vec<Step>>,
}

/// Middleware entry point: evaluate the gate's steps in order.
pub async fn run(State(gate): State<Gate>, mut req: Request, next: Next) -> Response {
    let mut effects = ResponseEffects::default();

    for step in gate.steps.iter() {
        let outcome = match step {
            Step::Authenticate => authenticate::run(&gate.state, &mut req, &mut effects).await,
            Step::Authorize(required) => authorize::run(&gate.state, &req, required),
            Step::RateLimit => rate_limit::run(&gate.state, &mut req, &mut effects).await,
            Step::Csrf => csrf::run(&gate.state, &mut req, &mut effects).await,
        };

        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::Terminate(response) => return effects.apply(response),
        }
    }

    effects.apply(next.run(req).await)
}

/// Headers a step wants on the eventual response.
#[derive(Default)]
pub struct ResponseEffects {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseEffects {
    /// Append a Set-Cookie header.
    pub fn set_cookie(&mut self, cookie: &str) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            self.headers.push((header::SET_COOKIE, value));
        }
    }

    /// Append an arbitrary header.
    pub fn header(&mut self, name: HeaderName, value: String) {
        if let Ok(value) = HeaderValue::from_str(&value) {
            self.headers.push((name, value));
        }
    }

    fn apply(self, mut response: Response) -> Response {
        for (name, value) in self.headers {
            response.headers_mut().append(name, value);
        }
        response
    }
}
