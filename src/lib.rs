pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod gate;
pub mod headers;
pub mod jwt;
pub mod permissions;
pub mod request_id;
pub mod store;
pub mod tokens;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use tokio::net::TcpListener;

use gate::RateLimitSettings;
use jwt::JwtConfig;
use permissions::RoleMap;
use store::Store;
use tokens::TokenService;

/// Immutable configuration assembled once at startup and threaded through
/// constructors; nothing here is read from ambient state after process
/// start.
pub struct ServerConfig {
    /// Shared TTL store (cloneable, uses a connection pool internally)
    pub store: Store,
    /// Secret for signing and verifying access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing and verifying refresh tokens
    pub refresh_secret: Vec<u8>,
    /// Audience embedded in every token and required on verification
    pub audience: String,
    /// Issuer embedded in every token and required on verification
    pub issuer: String,
    /// Whether to set the Secure flag on cookies (true behind HTTPS)
    pub secure_cookies: bool,
    /// Fixed-window rate limiter settings
    pub rate_limit: RateLimitSettings,
    /// Role → permission mapping, immutable after startup
    pub roles: RoleMap,
}

/// Runtime state shared by the gate steps and the session endpoints.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub roles: Arc<RoleMap>,
    pub rate_limit: RateLimitSettings,
    pub secure_cookies: bool,
}

impl AppState {
    /// Build runtime state from the configuration.
    pub fn new(config: &ServerConfig) -> Self {
        let jwt = JwtConfig::new(
            &config.access_secret,
            &config.refresh_secret,
            &config.audience,
            &config.issuer,
        );
        Self {
            tokens: TokenService::new(jwt, config.store.clone()),
            store: config.store.clone(),
            roles: Arc::new(config.roles.clone()),
            rate_limit: config.rate_limit,
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let state = AppState::new(config);

    // Request ids must be assigned before any gate step runs, so that layer
    // sits outside the per-route gates.
    api::create_api_router(state)
        .layer(middleware::from_fn(request_id::assign_request_id))
        .layer(middleware::from_fn(headers::security_headers))
}

/// Run cleanup tasks and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(store: &Store) {
    cleanup::run_cleanup(store).await;
    cleanup::spawn_cleanup_scheduler(store.clone());
}

/// Run the server on the given listener. This function blocks until the
/// server exits. Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to
/// let the OS choose a random port. Returns the actual listening address.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> (tokio::task::JoinHandle<()>, SocketAddr) {
    init_cleanup(&config.store).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    let local_addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    (handle, local_addr)
}
