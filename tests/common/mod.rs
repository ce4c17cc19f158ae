#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use gatehouse::gate::RateLimitSettings;
use gatehouse::jwt::JwtConfig;
use gatehouse::permissions::RoleMap;
use gatehouse::store::Store;
use gatehouse::tokens::TokenService;
use gatehouse::{ServerConfig, create_app};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcde";
pub const AUDIENCE: &str = "test-audience";
pub const ISSUER: &str = "test-issuer";

pub const TEST_IP: &str = "203.0.113.7";

/// Build a test configuration backed by an in-memory store.
pub async fn test_config() -> ServerConfig {
    test_config_with_limits(RateLimitSettings::default()).await
}

pub async fn test_config_with_limits(rate_limit: RateLimitSettings) -> ServerConfig {
    let store = Store::open(":memory:")
        .await
        .expect("Failed to open test store");
    ServerConfig {
        store,
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        audience: AUDIENCE.to_string(),
        issuer: ISSUER.to_string(),
        secure_cookies: false,
        rate_limit,
        roles: RoleMap::default(),
    }
}

/// Create a test app and return (app, store).
pub async fn test_app() -> (Router, Store) {
    let config = test_config().await;
    let store = config.store.clone();
    (create_app(&config), store)
}

/// Token service wired to the same secrets as the test app.
pub fn token_service(store: Store) -> TokenService {
    TokenService::new(
        JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET, AUDIENCE, ISSUER),
        store,
    )
}

/// Fire a request at a clone of the app.
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

/// POST /login with the given identity, from the default test IP.
pub async fn login(
    app: &Router,
    user_id: &str,
    roles: &[&str],
    permissions: &[&str],
) -> Response<Body> {
    let body = serde_json::json!({
        "userId": user_id,
        "email": "test@example.com",
        "roles": roles,
        "permissions": permissions,
    });
    send(
        app,
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", TEST_IP)
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull a named cookie's value out of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .find(|c| c.starts_with(&prefix) && !c.contains("Max-Age=0"))
        .and_then(|c| c.split(';').next())
        .and_then(|kv| kv.split_once('='))
        .map(|(_, v)| v.to_string())
}

/// Check if cookies contain a cookie being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Login and return the "accessToken=..; refreshToken=.." cookie header.
pub async fn login_cookies(
    app: &Router,
    user_id: &str,
    roles: &[&str],
    permissions: &[&str],
) -> String {
    let response = login(app, user_id, roles, permissions).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    let access = cookie_value(&cookies, "accessToken").expect("no access token cookie");
    let refresh = cookie_value(&cookies, "refreshToken").expect("no refresh token cookie");
    format!("accessToken={}; refreshToken={}", access, refresh)
}

/// Read a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body was not JSON")
}
