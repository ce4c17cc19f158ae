//! Cookie parsing and construction for session and CSRF cookies.

use axum::http::{HeaderMap, header};

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Cookie name for the CSRF token. Readable by client scripts so they can
/// echo it in the `X-XSRF-TOKEN` header.
pub const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract a bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

/// Build an HTTP-only session cookie (`SameSite=Lax`).
pub fn session_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        name,
        value,
        max_age_secs,
        secure_suffix(secure)
    )
}

/// Build a cookie that clears a session cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{}",
        name,
        secure_suffix(secure)
    )
}

/// Build the CSRF cookie: script-readable, `SameSite=Strict`.
pub fn csrf_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    format!(
        "{}={}; SameSite=Strict; Path=/; Max-Age={}{}",
        CSRF_COOKIE_NAME,
        token,
        max_age_secs,
        secure_suffix(secure)
    )
}

fn secure_suffix(secure: bool) -> &'static str {
    if secure { "; Secure" } else { "" }
}
