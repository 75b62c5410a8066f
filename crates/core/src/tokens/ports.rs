//! Port interfaces for token storage, encryption and refresh

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duesync_domain::{AccountRole, Result, SyncContext, TokenRecord, TokenStatus};
use thiserror::Error;

/// Persistence for encrypted credential rows
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Load the record for one role, if any
    async fn find_token(&self, ctx: &SyncContext, role: AccountRole)
        -> Result<Option<TokenRecord>>;

    /// Insert or replace the record keyed by (user, student, role)
    async fn upsert_token(&self, record: &TokenRecord) -> Result<()>;

    /// Delete the record; returns whether one existed
    async fn delete_token(&self, ctx: &SyncContext, role: AccountRole) -> Result<bool>;

    /// Overwrite the access token (and a rotated refresh token) after refresh
    async fn update_access_token(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        encrypted_access: &str,
        encrypted_refresh: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Set the connection status; returns whether a record was updated
    async fn set_token_status(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        status: TokenStatus,
    ) -> Result<bool>;

    /// Record the calendar that events for this role are written to
    async fn set_calendar_id(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        calendar_id: &str,
    ) -> Result<()>;
}

/// Symmetric encryption for token values at rest
pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Tokens returned by a successful refresh
#[derive(Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("rotated", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Why a refresh failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// Consent revoked or refresh token invalid; the user must reconnect
    #[error("refresh token rejected: {0}")]
    Revoked(String),

    /// Network or provider trouble; retrying later may succeed
    #[error("refresh failed: {0}")]
    Transient(String),
}

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> std::result::Result<RefreshedToken, RefreshError>;
}
