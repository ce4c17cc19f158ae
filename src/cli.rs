//! CLI argument parsing, validation, and startup helpers.

use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::gate::RateLimitSettings;
use crate::permissions::RoleMap;
use crate::store::Store;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Gatehouse", about = "Session-token authentication gateway")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    pub port: u16,

    /// Path to SQLite store file
    #[arg(short, long, default_value = "gatehouse.db")]
    pub database: String,

    /// Audience embedded in every token and required on verification
    #[arg(long, default_value = "gatehouse")]
    pub audience: String,

    /// Issuer embedded in every token and required on verification
    #[arg(long, default_value = "gatehouse")]
    pub issuer: String,

    /// Rate-limit window in seconds
    #[arg(long, default_value = "900")]
    pub rate_limit_window_secs: u64,

    /// Maximum requests per client IP within the window
    #[arg(long, default_value = "100")]
    pub rate_limit_max: i64,

    /// Set the Secure flag on cookies (requires HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Path to file containing the access-token secret. Prefer using the
    /// JWT_SECRET env var instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh-token secret. Prefer using the
    /// JWT_REFRESH_SECRET env var instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "Signing secret is required. Set the {} environment variable (recommended) or pass a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the store, logging errors if it fails.
pub async fn open_store(path: &str) -> Option<Store> {
    match Store::open(path).await {
        Ok(store) => {
            info!(path = %path, "Store opened");
            Some(store)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open store");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    store: Store,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        store,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        audience: args.audience.clone(),
        issuer: args.issuer.clone(),
        secure_cookies: args.secure_cookies,
        rate_limit: RateLimitSettings {
            window_secs: args.rate_limit_window_secs,
            max: args.rate_limit_max,
        },
        roles: RoleMap::default(),
    }
}
