//! Fixed-window request counters per client key.

use sqlx::sqlite::SqlitePool;

use super::now_secs;

pub struct RateCounters {
    pool: SqlitePool,
}

impl RateCounters {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically increment the counter for a key and return the new value.
    ///
    /// A key whose window has lapsed restarts at 1 with a fresh expiry; the
    /// first hit in a window sets the window end. Single statement, so
    /// concurrent requests never undercount.
    pub async fn increment(&self, key: &str, window_secs: u64) -> Result<i64, sqlx::Error> {
        let now = now_secs();
        let window_end = now + window_secs as i64;
        let (count,): (i64,) = sqlx::query_as(
            "INSERT INTO rate_counters (key, count, expires_at) VALUES (?1, 1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                 count = CASE WHEN rate_counters.expires_at <= ?3
                     THEN 1 ELSE rate_counters.count + 1 END,
                 expires_at = CASE WHEN rate_counters.expires_at <= ?3
                     THEN ?2 ELSE rate_counters.expires_at END
             RETURNING count",
        )
        .bind(key)
        .bind(window_end)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Delete all expired rows.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rate_counters WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
