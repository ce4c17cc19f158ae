//! Outstanding CSRF tokens.
//!
//! Row existence is the validity marker; tokens stay valid until TTL expiry
//! or explicit deletion, they are not consumed on use.

use sqlx::sqlite::SqlitePool;

use super::now_secs;

pub struct CsrfTokens {
    pool: SqlitePool,
}

impl CsrfTokens {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a freshly issued CSRF token.
    pub async fn put(&self, token: &str, ttl_secs: u64) -> Result<(), sqlx::Error> {
        let expires_at = now_secs() + ttl_secs as i64;
        sqlx::query(
            "INSERT INTO csrf_tokens (token, expires_at) VALUES (?, ?)
             ON CONFLICT(token) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether a CSRF token is currently valid.
    pub async fn contains(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM csrf_tokens WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now_secs())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Delete all expired rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM csrf_tokens WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
