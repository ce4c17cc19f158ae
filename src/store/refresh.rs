//! Refresh-token tracking: at most one active refresh token per user.

use sqlx::sqlite::SqlitePool;

use super::now_secs;

pub struct RefreshTokens {
    pool: SqlitePool,
}

impl RefreshTokens {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store the user's refresh token, replacing any prior one.
    pub async fn put(&self, user_id: &str, token: &str, ttl_secs: u64) -> Result<(), sqlx::Error> {
        let expires_at = now_secs() + ttl_secs as i64;
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET token = excluded.token,
                 expires_at = excluded.expires_at",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the user's active refresh token, if any.
    pub async fn get(&self, user_id: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT token FROM refresh_tokens WHERE user_id = ? AND expires_at > ?",
        )
        .bind(user_id)
        .bind(now_secs())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(token,)| token))
    }

    /// Delete the user's refresh token. Returns whether a row was removed.
    pub async fn delete(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
