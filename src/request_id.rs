//! Per-request identifiers.
//!
//! Every request gets a UUID, exposed to handlers via extensions and echoed
//! back as an `X-Request-Id` response header. Internal-error bodies carry it
//! so a client report can be correlated with server logs.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Identifier assigned to a single request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Middleware that stamps each request with a fresh id.
pub async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
