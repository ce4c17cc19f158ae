//! JWT signing and verification.
//!
//! Dual-token scheme: short-lived access tokens (15 minutes) and long-lived
//! refresh tokens (7 days), signed with HMAC-SHA-512 under independent
//! secrets so that compromise of one class does not compromise the other.
//! Audience and issuer are embedded at signing time and enforced on
//! verification.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::permissions::Permission;

/// Access token duration: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Token class, used to select the signing secret and the blacklist TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Natural lifetime of this token class.
    pub fn ttl_secs(self) -> u64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL_SECS,
            TokenKind::Refresh => REFRESH_TOKEN_TTL_SECS,
        }
    }
}

/// Identity payload supplied at login, before timestamps are stamped.
#[derive(Debug, Clone)]
pub struct TokenPayload {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<Permission>,
}

/// Claims embedded in both token variants.
///
/// `iat`/`exp` are stamped by the signer and never client-supplied; `userId`
/// is immutable once a token is issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiration time (Unix seconds)
    pub exp: u64,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    /// The identity payload minus timestamps, for re-stamping on rotation.
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
        }
    }

    /// Seconds until expiry, zero if already expired.
    pub fn remaining_secs(&self) -> u64 {
        self.exp.saturating_sub(now_secs())
    }
}

/// Key material and token metadata for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    audience: String,
    issuer: String,
}

impl JwtConfig {
    /// Create a JWT configuration from the two signing secrets.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        audience: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            audience: audience.into(),
            issuer: issuer.into(),
        }
    }

    /// Sign a token of the given class, stamping `iat`/`exp` now.
    pub fn sign(&self, kind: TokenKind, payload: &TokenPayload) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let claims = Claims {
            user_id: payload.user_id.clone(),
            email: payload.email.clone(),
            roles: payload.roles.clone(),
            permissions: payload.permissions.clone(),
            iat: now,
            exp: now + kind.ttl_secs(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, key)
            .map_err(JwtError::Encoding)
    }

    /// Validate signature, audience, issuer, and expiry of a token.
    pub fn validate(&self, kind: TokenKind, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let token_data =
            jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(JwtError::Decoding)?;

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
