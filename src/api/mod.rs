//! HTTP surface: session endpoints plus sample protected resources, each
//! route group behind its own gate pipeline.

pub mod error;
mod protected;
mod session;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::gate::{self, Pipeline};
use crate::permissions::Permission;

/// Create the API router.
///
/// Pipeline order is configured per route group; authentication always runs
/// before authorization where both are present.
pub fn create_api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(session::health))
        .with_state(state.clone());

    let login = Router::new()
        .route("/login", post(session::login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Pipeline::new().rate_limit().into_gate(state.clone()),
            gate::run,
        ));

    // Refresh and logout read cookies directly; a caller with only an
    // expired access token must still be able to reach them.
    let cookie_routes = Router::new()
        .route("/refresh", post(session::refresh))
        .route("/logout", post(session::logout))
        .with_state(state.clone());

    let authenticated = Router::new()
        .route("/me", get(session::me))
        .route("/revoke", post(session::revoke))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Pipeline::new().authenticate().into_gate(state.clone()),
            gate::run,
        ));

    let admin = Router::new()
        .route("/admin", get(protected::admin))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Pipeline::new()
                .authenticate()
                .authorize([Permission::AdminAccess])
                .into_gate(state.clone()),
            gate::run,
        ));

    let limited = Router::new()
        .route("/limited", get(protected::limited))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Pipeline::new().authenticate().rate_limit().into_gate(state.clone()),
            gate::run,
        ));

    let data = Router::new()
        .route("/data", get(protected::data_index).post(protected::data_create))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            Pipeline::new()
                .authenticate()
                .authorize([Permission::Read])
                .rate_limit()
                .csrf()
                .into_gate(state),
            gate::run,
        ));

    Router::new()
        .merge(public)
        .merge(login)
        .merge(cookie_routes)
        .merge(authenticated)
        .merge(admin)
        .merge(limited)
        .merge(data)
}
