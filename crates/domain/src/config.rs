//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_SYNC_CRON, DEFAULT_BASE_DELAY_MS, DEFAULT_DATABASE_PATH, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, DEFAULT_OAUTH_SCOPES, DEFAULT_PASS_TIMEOUT_MS, DEFAULT_POOL_SIZE,
    DEFAULT_REDIRECT_URI, MAX_REPORTED_ERRORS,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub oauth: OAuthSettings,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATABASE_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            encryption_key: None,
        }
    }
}

/// Sync pass configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Wall-clock budget for one student pass
    pub pass_timeout_ms: u64,
    /// Attempts per gateway operation, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Cap on per-item error summaries in a pass result
    pub max_reported_errors: usize,
    /// Six-field cron expression (seconds first)
    pub auto_sync_cron: String,
    pub auto_sync_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pass_timeout_ms: DEFAULT_PASS_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            max_reported_errors: MAX_REPORTED_ERRORS,
            auto_sync_cron: DEFAULT_AUTO_SYNC_CRON.to_string(),
            auto_sync_enabled: true,
        }
    }
}

impl SyncConfig {
    pub fn pass_timeout(&self) -> Duration {
        Duration::from_millis(self.pass_timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Google OAuth client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_OAUTH_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}
