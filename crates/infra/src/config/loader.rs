//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Environment variables, when `DUESYNC_DB_PATH` is set
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. Otherwise built-in defaults
//!
//! Secrets (`DUESYNC_DB_ENCRYPTION_KEY`, `DUESYNC_OAUTH_CLIENT_SECRET`) are
//! read from the environment in every case, so they can stay out of files.
//!
//! ## Environment Variables
//! - `DUESYNC_DB_PATH`: Database file path
//! - `DUESYNC_DB_POOL_SIZE`: Connection pool size
//! - `DUESYNC_DB_ENCRYPTION_KEY`: SQLCipher key (keychain is used when unset)
//! - `DUESYNC_SYNC_PASS_TIMEOUT_MS`: Wall-clock budget per student pass
//! - `DUESYNC_SYNC_MAX_ATTEMPTS`: Attempts per gateway operation
//! - `DUESYNC_SYNC_BASE_DELAY_MS` / `DUESYNC_SYNC_MAX_DELAY_MS`: Backoff bounds
//! - `DUESYNC_SYNC_MAX_REPORTED_ERRORS`: Error summaries kept per pass
//! - `DUESYNC_AUTO_SYNC_CRON`: Six-field cron expression
//! - `DUESYNC_AUTO_SYNC_ENABLED`: Whether the scheduler runs (true/false)
//! - `DUESYNC_OAUTH_CLIENT_ID`, `DUESYNC_OAUTH_CLIENT_SECRET`,
//!   `DUESYNC_OAUTH_REDIRECT_URI`, `DUESYNC_OAUTH_SCOPES` (space-separated)
//!
//! ## File Locations
//! 1. `./config.{json,toml}`, then `./duesync.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use duesync_domain::{Config, DueSyncError, Result};

const FILE_NAMES: &[&str] = &["config.json", "config.toml", "duesync.json", "duesync.toml"];
const SEARCH_DIRS: &[&str] = &[".", "..", "../.."];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `DueSyncError::Config` if a source exists but is malformed.
pub fn load() -> Result<Config> {
    if std::env::var_os("DUESYNC_DB_PATH").is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::warn!("No configuration found; using defaults");
            let mut config = Config::default();
            apply_secret_overrides(&mut config);
            Ok(config)
        }
    }
}

/// Load configuration from environment variables
///
/// `DUESYNC_DB_PATH` is required; every other variable falls back to its
/// default.
///
/// # Errors
/// Returns `DueSyncError::Config` if the path is missing or a value does not
/// parse.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();
    let mut config = Config::default();

    config.database.path = env_var("DUESYNC_DB_PATH")?;
    config.database.pool_size = env_parse("DUESYNC_DB_POOL_SIZE", defaults.database.pool_size)?;

    config.sync.pass_timeout_ms =
        env_parse("DUESYNC_SYNC_PASS_TIMEOUT_MS", defaults.sync.pass_timeout_ms)?;
    config.sync.max_attempts = env_parse("DUESYNC_SYNC_MAX_ATTEMPTS", defaults.sync.max_attempts)?;
    config.sync.base_delay_ms =
        env_parse("DUESYNC_SYNC_BASE_DELAY_MS", defaults.sync.base_delay_ms)?;
    config.sync.max_delay_ms = env_parse("DUESYNC_SYNC_MAX_DELAY_MS", defaults.sync.max_delay_ms)?;
    config.sync.max_reported_errors =
        env_parse("DUESYNC_SYNC_MAX_REPORTED_ERRORS", defaults.sync.max_reported_errors)?;
    if let Ok(cron) = std::env::var("DUESYNC_AUTO_SYNC_CRON") {
        config.sync.auto_sync_cron = cron;
    }
    config.sync.auto_sync_enabled =
        env_bool("DUESYNC_AUTO_SYNC_ENABLED", defaults.sync.auto_sync_enabled);

    if let Ok(client_id) = std::env::var("DUESYNC_OAUTH_CLIENT_ID") {
        config.oauth.client_id = client_id;
    }
    if let Ok(redirect_uri) = std::env::var("DUESYNC_OAUTH_REDIRECT_URI") {
        config.oauth.redirect_uri = redirect_uri;
    }
    if let Ok(scopes) = std::env::var("DUESYNC_OAUTH_SCOPES") {
        config.oauth.scopes = scopes.split_whitespace().map(str::to_string).collect();
    }

    apply_secret_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `DueSyncError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DueSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DueSyncError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DueSyncError::Config(format!("Failed to read config file: {e}")))?;

    let mut config = parse_config(&contents, &config_path)?;
    apply_secret_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Parse configuration, detecting the format from the file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DueSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DueSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(DueSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.database.path.trim().is_empty() {
        return Err(DueSyncError::Config("database.path must not be empty".into()));
    }
    if config.sync.max_attempts == 0 {
        return Err(DueSyncError::Config("sync.max_attempts must be at least 1".into()));
    }
    if config.sync.pass_timeout_ms == 0 {
        return Err(DueSyncError::Config("sync.pass_timeout_ms must be positive".into()));
    }
    if config.sync.base_delay_ms > config.sync.max_delay_ms {
        return Err(DueSyncError::Config(
            "sync.base_delay_ms must not exceed sync.max_delay_ms".into(),
        ));
    }
    Ok(())
}

fn apply_secret_overrides(config: &mut Config) {
    if let Some(key) = non_empty_env("DUESYNC_DB_ENCRYPTION_KEY") {
        config.database.encryption_key = Some(key);
    }
    if let Some(secret) = non_empty_env("DUESYNC_OAUTH_CLIENT_SECRET") {
        config.oauth.client_secret = Some(secret);
    }
}

/// Probe the standard locations and return the first config file found.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| {
            SEARCH_DIRS
                .iter()
                .flat_map(move |dir| FILE_NAMES.iter().map(move |name| root.join(dir).join(name)))
        })
        .find(|path| path.is_file())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| DueSyncError::Config(format!("Missing required environment variable: {key}")))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable, or return `default` when unset.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| DueSyncError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
