//! Decoded-claims cache keyed by token string.
//!
//! Purely a performance cache for repeated verification within a token's
//! lifetime. Absence of an entry never implies invalidity, and readers
//! treat lookup errors as a miss.

use sqlx::sqlite::SqlitePool;

use super::now_secs;

pub struct ClaimsCache {
    pool: SqlitePool,
}

impl ClaimsCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cache the decoded claims JSON for a token.
    pub async fn put(&self, token: &str, claims: &str, ttl_secs: u64) -> Result<(), sqlx::Error> {
        let expires_at = now_secs() + ttl_secs as i64;
        sqlx::query(
            "INSERT INTO claims_cache (token, claims, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET claims = excluded.claims,
                 expires_at = excluded.expires_at",
        )
        .bind(token)
        .bind(claims)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up cached claims JSON for a token.
    pub async fn get(&self, token: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT claims FROM claims_cache WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now_secs())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(claims,)| claims))
    }

    /// Delete all expired rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM claims_cache WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
