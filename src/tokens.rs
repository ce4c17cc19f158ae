//! Token lifecycle: issuance, verification, rotation, and revocation.
//!
//! Composes the JWT layer with the shared store. Store-failure policy is
//! asymmetric on purpose: blacklist lookups fail secure (an unreachable
//! store counts as revoked), while the claims cache degrades to a miss and
//! a failed refresh-token write never blocks issuance.

use tracing::{debug, error, warn};

use crate::jwt::{Claims, JwtConfig, JwtError, TokenKind, TokenPayload};
use crate::store::Store;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token service shared by the request gate and the session endpoints.
#[derive(Clone)]
pub struct TokenService {
    jwt: JwtConfig,
    store: Store,
}

impl TokenService {
    pub fn new(jwt: JwtConfig, store: Store) -> Self {
        Self { jwt, store }
    }

    /// Sign an access/refresh pair for a login payload and track the refresh
    /// token under the user's id, replacing any prior one (single active
    /// session per user, last write wins).
    pub async fn generate_token_pair(
        &self,
        payload: &TokenPayload,
    ) -> Result<TokenPair, JwtError> {
        let access_token = self.jwt.sign(TokenKind::Access, payload)?;
        let refresh_token = self.jwt.sign(TokenKind::Refresh, payload)?;

        if let Err(e) = self
            .store
            .refresh_tokens()
            .put(
                &payload.user_id,
                &refresh_token,
                TokenKind::Refresh.ttl_secs(),
            )
            .await
        {
            // The pair is still usable; revocation for this session just has
            // nothing to look up.
            error!(user_id = %payload.user_id, error = %e, "Failed to store refresh token");
        }

        debug!(user_id = %payload.user_id, "Token pair generated");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token, returning its claims or `None` on any
    /// verification failure.
    ///
    /// Consults the decoded-claims cache first and repopulates it on a
    /// successful verification with the token's remaining life as TTL. The
    /// cache is a performance shortcut, not a trust boundary: read errors
    /// degrade to a miss and never reject the token.
    pub async fn verify_access_token(&self, token: &str) -> Option<Claims> {
        match self.store.claims_cache().get(token).await {
            Ok(Some(json)) => match serde_json::from_str::<Claims>(&json) {
                Ok(claims) => return Some(claims),
                Err(e) => debug!(error = %e, "Discarding unparseable cached claims"),
            },
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Claims cache read failed, verifying directly"),
        }

        let claims = match self.jwt.validate(TokenKind::Access, token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Access token validation failed");
                return None;
            }
        };

        let remaining = claims.remaining_secs();
        if remaining > 0 {
            if let Ok(json) = serde_json::to_string(&claims) {
                if let Err(e) = self.store.claims_cache().put(token, &json, remaining).await {
                    debug!(error = %e, "Failed to cache decoded claims");
                }
            }
        }

        Some(claims)
    }

    /// Verify a refresh token against the refresh secret.
    pub async fn verify_refresh_token(&self, token: &str) -> Option<Claims> {
        match self.jwt.validate(TokenKind::Refresh, token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "Refresh token validation failed");
                None
            }
        }
    }

    /// Exchange a valid refresh token for a fresh access token carrying the
    /// same identity with re-stamped timestamps. The refresh token itself is
    /// not rotated.
    ///
    /// `Ok(None)` means the refresh token did not verify (a credential
    /// problem); `Err` means signing the replacement failed (an internal
    /// problem).
    pub async fn rotate_access_token(&self, refresh_token: &str) -> Result<Option<String>, JwtError> {
        let Some(claims) = self.verify_refresh_token(refresh_token).await else {
            return Ok(None);
        };
        let access = self.jwt.sign(TokenKind::Access, &claims.payload())?;
        Ok(Some(access))
    }

    /// Revoke the user's tracked refresh token, if any: blacklist it for the
    /// refresh-token lifetime and drop the tracking entry. Idempotent:
    /// succeeds even when no token was tracked.
    pub async fn revoke_user_tokens(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        if let Some(refresh_token) = self.store.refresh_tokens().get(user_id).await? {
            self.store
                .blacklist()
                .add(&refresh_token, TokenKind::Refresh.ttl_secs())
                .await?;
            self.store.refresh_tokens().delete(user_id).await?;
        }
        debug!(user_id = %user_id, "User tokens revoked");
        Ok(true)
    }

    /// Blacklist a specific presented token for its class lifetime.
    pub async fn blacklist_token(&self, token: &str, kind: TokenKind) -> Result<(), sqlx::Error> {
        self.store.blacklist().add(token, kind.ttl_secs()).await
    }

    /// Whether a token string has been revoked. Fails secure: a store error
    /// counts as blacklisted.
    pub async fn is_blacklisted(&self, token: &str) -> bool {
        match self.store.blacklist().contains(token).await {
            Ok(blacklisted) => blacklisted,
            Err(e) => {
                warn!(error = %e, "Blacklist check failed, rejecting token");
                true
            }
        }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
