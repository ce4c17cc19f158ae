//! Scheduled cleanup of expired store rows.
//!
//! Reads already treat expired rows as absent; this task just keeps the
//! tables from growing without bound.

use std::time::Duration;

use tracing::{error, info};

use crate::store::Store;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(store: &Store) {
    match store.refresh_tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up refresh tokens: {}", e),
    }

    match store.blacklist().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired blacklist entries", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up blacklist entries: {}", e),
    }

    match store.claims_cache().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired cached claims", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up cached claims: {}", e),
    }

    match store.csrf_tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired CSRF tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up CSRF tokens: {}", e),
    }

    match store.rate_counters().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} lapsed rate counters", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up rate counters: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(store: Store) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&store).await;
        }
    })
}
