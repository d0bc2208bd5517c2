use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default model when `ANTHROPIC_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Application configuration loaded from environment variables.
///
/// Nothing here is required at startup: a missing `ANTHROPIC_API_KEY` only fails
/// requests that need the model, and missing Auth0 settings only fail privileged routes.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelSettings,
    pub auth: AuthSettings,
    /// Root directory for staged uploads. Defaults to the OS temp dir.
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub visitor_count_file: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

/// Settings consumed by the model gateway.
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    pub api_key: Option<String>,
    pub model: String,
    /// No timeout unless `MODEL_TIMEOUT_SECS` is set.
    pub timeout: Option<Duration>,
}

/// Identity-provider settings. Also exposed (minus nothing secret) via `/api/config`.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub domain: Option<String>,
    pub audience: Option<String>,
    pub client_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timeout = optional_env("MODEL_TIMEOUT_SECS")
            .map(|s| {
                s.parse::<u64>()
                    .context("MODEL_TIMEOUT_SECS must be a whole number of seconds")
            })
            .transpose()?
            .map(Duration::from_secs);

        Ok(Config {
            model: ModelSettings {
                api_key: optional_env("ANTHROPIC_API_KEY"),
                model: optional_env("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout,
            },
            auth: AuthSettings {
                domain: optional_env("AUTH0_DOMAIN"),
                audience: optional_env("AUTH0_AUDIENCE"),
                client_id: optional_env("AUTH0_CLIENT_ID"),
            },
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            static_dir: optional_env("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            visitor_count_file: optional_env("VISITOR_COUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("visitor_count.json")),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5004".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an env var, treating unset and blank values the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
