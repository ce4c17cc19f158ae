//! Identity plumbing shared by the request gate and the session endpoints:
//! cookie names and builders, bearer-header parsing, client IP extraction,
//! and the identity type attached to authenticated requests.

mod cookie;
mod ip;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, clear_cookie,
    csrf_cookie, get_cookie, session_cookie,
};
pub use ip::extract_client_ip;
pub use types::Identity;
