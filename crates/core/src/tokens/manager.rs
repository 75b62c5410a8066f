//! Token lifecycle manager
//!
//! Owns the encrypted credential rows for every (user, student, role). Hands
//! out access tokens that stay valid past a safety margin, refreshing them
//! transparently, and flips a role to "requires re-authentication" when the
//! refresh token is dead.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use duesync_common::{redact_email, Clock};
use duesync_domain::constants::TOKEN_REFRESH_MARGIN_SECS;
use duesync_domain::{
    AccessToken, AccountRole, ConnectionStatus, DueSyncError, Result, SyncContext, TokenGrant,
    TokenRecord, TokenStatus, ValidToken,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::{RefreshError, TokenCipher, TokenRefresher, TokenRepository};

type TokenKey = (String, String, AccountRole);

/// Manages OAuth credentials per (user, student, account role)
pub struct TokenLifecycleManager {
    repository: Arc<dyn TokenRepository>,
    cipher: Arc<dyn TokenCipher>,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    refresh_margin: Duration,
    // Single-flight refresh per identity
    refresh_locks: DashMap<TokenKey, Arc<Mutex<()>>>,
}

impl TokenLifecycleManager {
    /// Wire the manager to its store, cipher, refresher and clock.
    pub fn new(
        repository: Arc<dyn TokenRepository>,
        cipher: Arc<dyn TokenCipher>,
        refresher: Arc<dyn TokenRefresher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            cipher,
            refresher,
            clock,
            refresh_margin: Duration::seconds(TOKEN_REFRESH_MARGIN_SECS),
            refresh_locks: DashMap::new(),
        }
    }

    /// Return a token that will not expire within the refresh margin.
    ///
    /// # Errors
    /// `NotConnected` when no record exists, `AuthorizationExpired` when the
    /// record needs re-authentication or the refresh token was rejected,
    /// `Network` when the refresh endpoint could not be reached.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn get_valid_token(&self, ctx: &SyncContext, role: AccountRole) -> Result<ValidToken> {
        let record = self.load_usable(ctx, role).await?;
        if !self.needs_refresh(&record) {
            return self.to_valid_token(&record);
        }

        let lock = self.refresh_lock(ctx, role);
        let _guard = lock.lock().await;

        // Another caller may have refreshed while we waited
        let record = self.load_usable(ctx, role).await?;
        if !self.needs_refresh(&record) {
            return self.to_valid_token(&record);
        }

        self.refresh_record(ctx, role, record).await
    }

    /// Refresh regardless of expiry.
    ///
    /// Used after the calendar provider rejected a token that looked valid.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn force_refresh(&self, ctx: &SyncContext, role: AccountRole) -> Result<ValidToken> {
        let lock = self.refresh_lock(ctx, role);
        let _guard = lock.lock().await;

        let record = self.load_usable(ctx, role).await?;
        self.refresh_record(ctx, role, record).await
    }

    /// Encrypt and upsert credentials from a completed OAuth flow.
    ///
    /// Reconnecting the same account keeps its calendar. A grant without a
    /// refresh token reuses the stored one.
    #[instrument(skip(self, grant), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn store(&self, ctx: &SyncContext, role: AccountRole, grant: TokenGrant) -> Result<()> {
        if grant.access_token.is_empty() {
            return Err(DueSyncError::InvalidInput("access token is empty".into()));
        }

        let existing = self.repository.find_token(ctx, role).await?;
        let same_account = existing.as_ref().is_some_and(|r| {
            grant.account_email.is_some() && r.account_email == grant.account_email
        });

        let encrypted_refresh = match (grant.refresh_token.is_empty(), &existing) {
            (false, _) => self.cipher.encrypt(&grant.refresh_token)?,
            (true, Some(record)) if same_account => record.encrypted_refresh.clone(),
            (true, _) => {
                return Err(DueSyncError::InvalidInput("refresh token is missing".into()));
            }
        };

        let record = TokenRecord {
            user_id: ctx.user_id.clone(),
            student_id: ctx.student_id.clone(),
            role,
            encrypted_access: self.cipher.encrypt(&grant.access_token)?,
            encrypted_refresh,
            expires_at: grant.expires_at,
            calendar_id: existing.filter(|_| same_account).and_then(|r| r.calendar_id),
            account_email: grant.account_email.clone(),
            status: TokenStatus::Active,
            updated_at: self.clock.now(),
        };
        self.repository.upsert_token(&record).await?;

        info!(
            account = %grant.account_email.as_deref().map_or_else(|| "unknown".to_string(), redact_email),
            expires_at = %grant.expires_at,
            "stored credentials"
        );
        Ok(())
    }

    /// Delete the credentials. Idempotent; returns whether a record existed.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn revoke(&self, ctx: &SyncContext, role: AccountRole) -> Result<bool> {
        let removed = self.repository.delete_token(ctx, role).await?;
        self.refresh_locks.remove(&key(ctx, role));
        info!(removed, "revoked credentials");
        Ok(removed)
    }

    /// Flag the role as requiring re-authentication. Mappings are untouched.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub async fn mark_invalid(&self, ctx: &SyncContext, role: AccountRole) -> Result<()> {
        let updated =
            self.repository.set_token_status(ctx, role, TokenStatus::RequiresReauth).await?;
        if updated {
            warn!("credentials marked as requiring re-authentication");
        }
        Ok(())
    }

    /// Remember the calendar created for this role.
    pub async fn set_calendar_id(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        calendar_id: &str,
    ) -> Result<()> {
        self.repository.set_calendar_id(ctx, role, calendar_id).await
    }

    /// Connection state for display.
    pub async fn connection_status(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
    ) -> Result<ConnectionStatus> {
        let record = self.repository.find_token(ctx, role).await?;
        Ok(ConnectionStatus::from_record(record.as_ref()))
    }

    async fn load_usable(&self, ctx: &SyncContext, role: AccountRole) -> Result<TokenRecord> {
        let record = self
            .repository
            .find_token(ctx, role)
            .await?
            .ok_or_else(|| DueSyncError::NotConnected(format!("{role} account is not connected")))?;

        if record.status == TokenStatus::RequiresReauth {
            return Err(DueSyncError::AuthorizationExpired(format!(
                "{role} account requires re-authentication"
            )));
        }
        Ok(record)
    }

    fn needs_refresh(&self, record: &TokenRecord) -> bool {
        record.expires_at - self.clock.now() <= self.refresh_margin
    }

    fn to_valid_token(&self, record: &TokenRecord) -> Result<ValidToken> {
        let secret = self.cipher.decrypt(&record.encrypted_access)?;
        Ok(ValidToken {
            token: AccessToken::new(secret, record.expires_at),
            calendar_id: record.calendar_id.clone(),
            account_email: record.account_email.clone(),
        })
    }

    async fn refresh_record(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        record: TokenRecord,
    ) -> Result<ValidToken> {
        let refresh_token = self.cipher.decrypt(&record.encrypted_refresh)?;
        debug!(expires_at = %record.expires_at, "refreshing access token");

        match self.refresher.refresh(&refresh_token).await {
            Ok(refreshed) => {
                let encrypted_access = self.cipher.encrypt(&refreshed.access_token)?;
                let encrypted_refresh =
                    refreshed.refresh_token.as_deref().map(|t| self.cipher.encrypt(t)).transpose()?;

                self.repository
                    .update_access_token(
                        ctx,
                        role,
                        &encrypted_access,
                        encrypted_refresh.as_deref(),
                        refreshed.expires_at,
                    )
                    .await?;

                info!(
                    expires_at = %refreshed.expires_at,
                    rotated = refreshed.refresh_token.is_some(),
                    "access token refreshed"
                );
                Ok(ValidToken {
                    token: AccessToken::new(refreshed.access_token, refreshed.expires_at),
                    calendar_id: record.calendar_id,
                    account_email: record.account_email,
                })
            }
            Err(RefreshError::Revoked(reason)) => {
                warn!(reason = %reason, "refresh token rejected");
                self.mark_invalid(ctx, role).await?;
                Err(DueSyncError::AuthorizationExpired(format!(
                    "{role} account must be reconnected: {reason}"
                )))
            }
            Err(RefreshError::Transient(reason)) => {
                warn!(reason = %reason, "token refresh failed");
                Err(DueSyncError::Network(format!("{role} token refresh failed: {reason}")))
            }
        }
    }

    fn refresh_lock(&self, ctx: &SyncContext, role: AccountRole) -> Arc<Mutex<()>> {
        self.refresh_locks.entry(key(ctx, role)).or_default().clone()
    }
}

fn key(ctx: &SyncContext, role: AccountRole) -> TokenKey {
    (ctx.user_id.clone(), ctx.student_id.clone(), role)
}
