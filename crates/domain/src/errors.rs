//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DueSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DueSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A pass for this student is already running
    #[error("Sync already in progress for student {0}")]
    SyncInProgress(String),

    /// No credentials stored for the account role
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Stored credentials can no longer be refreshed
    #[error("Authorization expired: {0}")]
    AuthorizationExpired(String),
}

impl DueSyncError {
    /// Whether the user has to reconnect the account to recover.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, Self::AuthorizationExpired(_) | Self::NotConnected(_))
    }
}

/// Result type alias for DueSync operations
pub type Result<T> = std::result::Result<T, DueSyncError>;
