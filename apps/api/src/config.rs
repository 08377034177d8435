use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub gemini_api_key: String,
    pub netlify_token: String,
    pub port: u16,
    pub rust_log: String,
    /// Root holding one directory per portfolio template.
    pub templates_dir: PathBuf,
    /// Generated sites are written under `<media_root>/portfolios`.
    pub media_root: PathBuf,
    pub max_concurrent_generations: usize,
    pub deploy_poll_interval_secs: u64,
    pub deploy_timeout_secs: u64,
    pub status_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            netlify_token: require_env("NETLIFY_TOKEN")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            templates_dir: std::env::var("TEMPLATES_DIR")
                .unwrap_or_else(|_| "templates/portfolios".to_string())
                .into(),
            media_root: std::env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "media".to_string())
                .into(),
            max_concurrent_generations: parse_env("MAX_CONCURRENT_GENERATIONS", 4)?,
            deploy_poll_interval_secs: parse_env("DEPLOY_POLL_INTERVAL_SECS", 5)?,
            deploy_timeout_secs: parse_env("DEPLOY_TIMEOUT_SECS", 300)?,
            status_ttl_secs: parse_env("STATUS_TTL_SECS", 3600)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
