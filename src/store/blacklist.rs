//! Revoked-token records.
//!
//! Entries carry a TTL equal to the remaining life of the token they block,
//! so they self-expire exactly when the token would have anyway.

use sqlx::sqlite::SqlitePool;

use super::now_secs;

pub struct Blacklist {
    pool: SqlitePool,
}

impl Blacklist {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark a token string as revoked. Idempotent; a repeat write extends
    /// the expiry, which is harmless for same-class tokens.
    pub async fn add(&self, token: &str, ttl_secs: u64) -> Result<(), sqlx::Error> {
        let expires_at = now_secs() + ttl_secs as i64;
        sqlx::query(
            "INSERT INTO blacklist (token, expires_at) VALUES (?, ?)
             ON CONFLICT(token) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether a token string is currently blacklisted.
    pub async fn contains(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM blacklist WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now_secs())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Delete all expired rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blacklist WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
