//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Build the configuration from `CDNBULK_*` environment variables
//! 2. If `CDNBULK_BASE_URL` is missing, fall back to a config file
//! 3. Files are JSON or TOML, detected by extension
//!
//! ## Environment Variables
//! - `CDNBULK_BASE_URL` (required): control-plane base URL
//! - `CDNBULK_API_TOKEN`: bearer token
//! - `CDNBULK_REQUEST_TIMEOUT`: per-request timeout in seconds
//! - `CDNBULK_POLL_INTERVAL`: seconds between polls of one job
//! - `CDNBULK_POLL_MAX_FAILURES`: consecutive failed polls before giving up
//! - `CDNBULK_POLL_TIMEOUT`: default polling timeout in seconds
//! - `CDNBULK_RETENTION`: seconds a record is kept after its last update
//! - `CDNBULK_SWEEP_INTERVAL`: seconds between retention sweeps
//! - `CDNBULK_WEBHOOK_URL`: terminal-state webhook
//! - `CDNBULK_LOG_LEVEL`: default log filter when `RUST_LOG` is unset
//! - `CDNBULK_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! `cdnbulk.{toml,json}` then `config.{toml,json}`, looked up in the working
//! directory, its two parents, and the executable's directory.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use cdnbulk_domain::{BulkError, Config, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["cdnbulk.toml", "cdnbulk.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `BulkError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `CDNBULK_BASE_URL` is required; unset optional variables keep their
/// defaults.
///
/// # Errors
/// Returns `BulkError::Config` if the base URL is missing or a value does
/// not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.remote.base_url = env_var("CDNBULK_BASE_URL")?;
    config.remote.api_token = env_opt("CDNBULK_API_TOKEN");
    if let Some(timeout) = env_parse("CDNBULK_REQUEST_TIMEOUT")? {
        config.remote.request_timeout_seconds = timeout;
    }

    if let Some(interval) = env_parse("CDNBULK_POLL_INTERVAL")? {
        config.polling.interval_seconds = interval;
    }
    if let Some(failures) = env_parse("CDNBULK_POLL_MAX_FAILURES")? {
        config.polling.max_consecutive_failures = failures;
    }
    config.polling.timeout_seconds = env_parse("CDNBULK_POLL_TIMEOUT")?;

    if let Some(retention) = env_parse("CDNBULK_RETENTION")? {
        config.registry.retention_seconds = retention;
    }
    if let Some(interval) = env_parse("CDNBULK_SWEEP_INTERVAL")? {
        config.registry.sweep_interval_seconds = interval;
    }

    config.notifications.webhook_url = env_opt("CDNBULK_WEBHOOK_URL");

    if let Some(level) = env_opt("CDNBULK_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("CDNBULK_LOG_JSON", false);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `BulkError::Config` if no file is found, it cannot be read, or
/// its contents are invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BulkError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BulkError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BulkError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BulkError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BulkError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BulkError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file among the standard locations
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
        dirs.push(cwd.join("../.."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| BulkError::Config(format!("Missing required environment variable: {}", key)))
}

/// Set and non-blank
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| BulkError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
