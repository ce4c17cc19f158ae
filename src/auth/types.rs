//! Authenticated identity attached to the request.

use crate::jwt::Claims;

/// Identity extracted from a verified access token.
///
/// Inserted into request extensions by the authentication step; later steps
/// and handlers read it from there.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Claims from the verified access token
    pub claims: Claims,
}

impl Identity {
    pub fn user_id(&self) -> &str {
        &self.claims.user_id
    }
}
