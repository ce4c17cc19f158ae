//! Shared TTL key-value store backed by SQLite.
//!
//! One table per key namespace, each row carrying an `expires_at` Unix
//! timestamp. Reads treat expired rows as absent; a periodic cleanup task
//! purges them (see `crate::cleanup`). The handle is cloneable and safe for
//! concurrent use; connection acquisition is bounded so an unavailable store
//! surfaces as an error instead of hanging a request.

mod blacklist;
mod claims_cache;
mod csrf;
mod rate;
mod refresh;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use blacklist::Blacklist;
pub use claims_cache::ClaimsCache;
pub use csrf::CsrfTokens;
pub use rate::RateCounters;
pub use refresh::RefreshTokens;

/// How long a request may wait for a store connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open or create a store at the given path.
    /// Use ":memory:" for an in-memory store.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Run store migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                // One active refresh token per user; a new login overwrites
                // the previous row (last write wins).
                "CREATE TABLE refresh_tokens (
                    user_id TEXT PRIMARY KEY,
                    token TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_refresh_tokens_expires ON refresh_tokens(expires_at)",
                // Revoked token strings, expiring when the token itself would.
                "CREATE TABLE blacklist (
                    token TEXT PRIMARY KEY,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_blacklist_expires ON blacklist(expires_at)",
                // Decoded-claims cache keyed by token string.
                "CREATE TABLE claims_cache (
                    token TEXT PRIMARY KEY,
                    claims TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_claims_cache_expires ON claims_cache(expires_at)",
                // Outstanding CSRF tokens; row existence is the validity marker.
                "CREATE TABLE csrf_tokens (
                    token TEXT PRIMARY KEY,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_csrf_tokens_expires ON csrf_tokens(expires_at)",
                // Fixed-window request counters per client key.
                "CREATE TABLE rate_counters (
                    key TEXT PRIMARY KEY,
                    count INTEGER NOT NULL,
                    expires_at INTEGER NOT NULL
                )",
                "CREATE INDEX idx_rate_counters_expires ON rate_counters(expires_at)",
            ],
        )
        .await
    }

    /// Get the refresh-token store.
    pub fn refresh_tokens(&self) -> RefreshTokens {
        RefreshTokens::new(self.pool.clone())
    }

    /// Get the token blacklist.
    pub fn blacklist(&self) -> Blacklist {
        Blacklist::new(self.pool.clone())
    }

    /// Get the decoded-claims cache.
    pub fn claims_cache(&self) -> ClaimsCache {
        ClaimsCache::new(self.pool.clone())
    }

    /// Get the CSRF token store.
    pub fn csrf_tokens(&self) -> CsrfTokens {
        CsrfTokens::new(self.pool.clone())
    }

    /// Get the rate-counter store.
    pub fn rate_counters(&self) -> RateCounters {
        RateCounters::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the store, releasing all connections. Subsequent operations fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Current Unix time in seconds.
pub(crate) fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_token_overwrite() {
        let store = Store::open(":memory:").await.unwrap();

        store
            .refresh_tokens()
            .put("123", "first-token", 3600)
            .await
            .unwrap();
        store
            .refresh_tokens()
            .put("123", "second-token", 3600)
            .await
            .unwrap();

        let stored = store.refresh_tokens().get("123").await.unwrap();
        assert_eq!(stored.as_deref(), Some("second-token"));
    }

    #[tokio::test]
    async fn test_refresh_token_delete() {
        let store = Store::open(":memory:").await.unwrap();

        store
            .refresh_tokens()
            .put("123", "token", 3600)
            .await
            .unwrap();
        assert!(store.refresh_tokens().delete("123").await.unwrap());
        assert!(store.refresh_tokens().get("123").await.unwrap().is_none());

        // Deleting again reports nothing removed.
        assert!(!store.refresh_tokens().delete("123").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_rows_are_absent() {
        let store = Store::open(":memory:").await.unwrap();

        store
            .refresh_tokens()
            .put("123", "token", 3600)
            .await
            .unwrap();
        store.blacklist().add("some-token", 3600).await.unwrap();
        store.csrf_tokens().put("csrf-token", 3600).await.unwrap();

        // Backdate every expiry.
        sqlx::query("UPDATE refresh_tokens SET expires_at = 0")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE blacklist SET expires_at = 0")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE csrf_tokens SET expires_at = 0")
            .execute(store.pool())
            .await
            .unwrap();

        assert!(store.refresh_tokens().get("123").await.unwrap().is_none());
        assert!(!store.blacklist().contains("some-token").await.unwrap());
        assert!(!store.csrf_tokens().contains("csrf-token").await.unwrap());
    }

    #[tokio::test]
    async fn test_claims_cache_round_trip() {
        let store = Store::open(":memory:").await.unwrap();

        store
            .claims_cache()
            .put("tok", r#"{"userId":"123"}"#, 60)
            .await
            .unwrap();

        let cached = store.claims_cache().get("tok").await.unwrap();
        assert_eq!(cached.as_deref(), Some(r#"{"userId":"123"}"#));
        assert!(store.claims_cache().get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_store_errors() {
        let store = Store::open(":memory:").await.unwrap();
        store.close().await;

        assert!(store.refresh_tokens().get("123").await.is_err());
        assert!(store.blacklist().contains("tok").await.is_err());
        assert!(store.rate_counters().increment("ip", 60).await.is_err());
    }
}
