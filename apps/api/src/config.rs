use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub llm_model: String,
    /// HTTP attempts per LLM call for 429 / 5xx responses.
    pub llm_max_attempts: u32,
    /// Language the generated CVs are written in.
    pub cv_language: String,
    /// When `None`, AI routes are open (development mode).
    pub api_key: Option<String>,
    pub client_url: String,
    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub api_rate_limit: u32,
    pub ai_rate_limit: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{other}' (expected 'pretty' or 'json')"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: env_or("LLM_MODEL", "claude-sonnet-4-20250514"),
            llm_max_attempts: parse_env("LLM_MAX_ATTEMPTS", 3)?,
            cv_language: env_or("CV_LANGUAGE", "Hebrew"),
            api_key: std::env::var("API_KEY").ok().filter(|k| !k.trim().is_empty()),
            client_url: env_or("CLIENT_URL", "http://localhost:5173"),
            port: parse_env("PORT", 3000)?,
            rust_log: env_or("RUST_LOG", "info"),
            log_format: parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            api_rate_limit: parse_env("API_RATE_LIMIT", 100)?,
            ai_rate_limit: parse_env("AI_RATE_LIMIT", 20)?,
            rate_limit_window_secs: parse_env("RATE_LIMIT_WINDOW_SECS", 15 * 60)?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Offline configuration for router tests. No API key, generous limits.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/candidate_ranker_test".to_string(),
            anthropic_api_key: "test-key".to_string(),
            llm_model: "scripted-model".to_string(),
            llm_max_attempts: 1,
            cv_language: "English".to_string(),
            api_key: None,
            client_url: "http://localhost:5173".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            log_format: LogFormat::Pretty,
            api_rate_limit: 1_000,
            ai_rate_limit: 1_000,
            rate_limit_window_secs: 60,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}"))
}
