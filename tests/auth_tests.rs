//! Tests for login and the authentication step.
//!
//! Covers token issuance, cookie and bearer-header extraction (and their
//! precedence), refresh-token fallback, and the 401 texts for each failure
//! mode.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;

#[tokio::test]
async fn test_login_sets_both_cookies() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    let access = cookies
        .iter()
        .find(|c| c.starts_with("accessToken="))
        .expect("no access token cookie");
    let refresh = cookies
        .iter()
        .find(|c| c.starts_with("refreshToken="))
        .expect("no refresh token cookie");

    for cookie in [access, refresh] {
        assert!(cookie.contains("HttpOnly"), "session cookie must be HttpOnly");
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"), "secure_cookies is off in tests");
    }

    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert!(body["tokens"]["accessToken"].is_string());
    assert!(body["tokens"]["refreshToken"].is_string());
}

#[tokio::test]
async fn test_login_requires_user_id() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_access_cookie_authenticates() {
    let (app, _) = test_app().await;
    let cookies = login_cookies(&app, "123", &["USER"], &["READ"]).await;

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("cookie", cookies)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], "123");
    assert_eq!(body["user"]["roles"][0], "USER");
    assert_eq!(body["user"]["permissions"][0], "READ");
}

#[tokio::test]
async fn test_bearer_header_authenticates() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let access = body_json(response).await["tokens"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("authorization", format!("Bearer {}", access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cookie_takes_precedence_over_bearer_header() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let access = body_json(response).await["tokens"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    // A bad cookie is not rescued by a good header.
    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("cookie", "accessToken=garbage")
            .header("authorization", format!("Bearer {}", access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("cookie", "accessToken=not-a-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_no_tokens_unauthorized() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Please login to continue");
}

#[tokio::test]
async fn test_refresh_cookie_fallback_issues_new_access_token() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let cookies = extract_set_cookies(&response);
    let refresh = cookie_value(&cookies, "refreshToken").unwrap();

    // No access token at all: the gate falls back to the refresh token and
    // sets a replacement access cookie on the response.
    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("cookie", format!("refreshToken={}", refresh))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    assert!(
        cookie_value(&cookies, "accessToken").is_some(),
        "fallback should set a new access token cookie"
    );
}

#[tokio::test]
async fn test_expired_access_token_is_not_rescued_by_refresh_cookie() {
    use gatehouse::jwt::Claims;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let cookies = extract_set_cookies(&response);
    let refresh = cookie_value(&cookies, "refreshToken").unwrap();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        user_id: "123".to_string(),
        email: None,
        roles: vec!["USER".to_string()],
        permissions: vec![],
        iat: now - 100,
        exp: now - 50,
        aud: AUDIENCE.to_string(),
        iss: ISSUER.to_string(),
    };
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(ACCESS_SECRET),
    )
    .unwrap();

    // A presented-but-expired access token terminates the request; the
    // fallback only applies when no access token is presented at all.
    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header(
                "cookie",
                format!("accessToken={}; refreshToken={}", expired, refresh),
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_refresh_endpoint_issues_working_access_token() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let cookies = extract_set_cookies(&response);
    let refresh = cookie_value(&cookies, "refreshToken").unwrap();

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/refresh")
            .header("cookie", format!("refreshToken={}", refresh))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let new_access = cookie_value(&extract_set_cookies(&response), "accessToken")
        .expect("refresh should set a new access cookie");

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/me")
            .header("cookie", format!("accessToken={}", new_access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_endpoint_without_cookie() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_endpoint_rejects_access_token() {
    let (app, _) = test_app().await;

    let response = login(&app, "123", &["USER"], &["READ"]).await;
    let access = cookie_value(&extract_set_cookies(&response), "accessToken").unwrap();

    // An access token in the refresh slot must not mint anything.
    let response = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/refresh")
            .header("cookie", format!("refreshToken={}", access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ambient_response_headers() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers().contains_key("x-request-id"));
}
