//! Account connect flow
//!
//! `start` hands out an authorization URL and parks the PKCE verifier under
//! its `state`; `complete` redeems the state from the redirect, exchanges the
//! code and stores the credentials for the role.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use duesync_common::auth::{extract_email_from_id_token, OAuthClient, OAuthClientError};
use duesync_common::{redact_email, Clock};
use duesync_core::TokenLifecycleManager;
use duesync_domain::{AccountRole, ConnectionStatus, DueSyncError, Result, SyncContext, TokenGrant};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// How long an authorization URL stays redeemable.
const PENDING_TTL_MINUTES: i64 = 10;

/// Returned to the caller to open in a browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectStart {
    pub authorization_url: String,
    pub state: String,
}

struct PendingConnect {
    ctx: SyncContext,
    role: AccountRole,
    code_verifier: String,
    started_at: DateTime<Utc>,
}

/// OAuth connect flow for both account roles
pub struct ConnectService {
    oauth: Arc<OAuthClient>,
    tokens: Arc<TokenLifecycleManager>,
    clock: Arc<dyn Clock>,
    pending: DashMap<String, PendingConnect>,
}

impl ConnectService {
    pub fn new(
        oauth: Arc<OAuthClient>,
        tokens: Arc<TokenLifecycleManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { oauth, tokens, clock, pending: DashMap::new() }
    }

    /// Begin connecting `role` for the pair.
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    pub fn start(&self, ctx: &SyncContext, role: AccountRole) -> ConnectStart {
        let now = self.clock.now();
        self.pending.retain(|_, pending| !is_expired(pending, now));

        let request = self.oauth.authorization_request();
        let state = request.challenge.state.clone();
        self.pending.insert(
            state.clone(),
            PendingConnect {
                ctx: ctx.clone(),
                role,
                code_verifier: request.challenge.code_verifier,
                started_at: now,
            },
        );
        debug!(pending = self.pending.len(), "authorization started");

        ConnectStart { authorization_url: request.url, state }
    }

    /// Finish the flow with the `state` and `code` from the redirect.
    ///
    /// # Errors
    /// `InvalidInput` for an unknown or expired state, `Auth` when the code
    /// is rejected, `Network` when the token endpoint is unreachable.
    #[instrument(skip_all)]
    pub async fn complete(&self, state: &str, code: &str) -> Result<ConnectionStatus> {
        let (_, pending) = self
            .pending
            .remove(state)
            .ok_or_else(|| DueSyncError::InvalidInput("unknown authorization state".into()))?;

        let issued_at = self.clock.now();
        if is_expired(&pending, issued_at) {
            warn!(role = %pending.role, "authorization state expired");
            return Err(DueSyncError::InvalidInput("authorization state expired".into()));
        }

        let tokens = self
            .oauth
            .exchange_code(code, &pending.code_verifier)
            .await
            .map_err(exchange_error)?;

        let account_email = match tokens.id_token.as_deref() {
            Some(id_token) => extract_email_from_id_token(id_token).unwrap_or_else(|err| {
                warn!(error = %err, "could not read account email from id token");
                None
            }),
            None => None,
        };

        let grant = TokenGrant {
            expires_at: tokens.expires_at(issued_at),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token.unwrap_or_default(),
            account_email,
        };
        let account = grant.account_email.as_deref().map_or_else(|| "unknown".to_string(), redact_email);

        self.tokens.store(&pending.ctx, pending.role, grant).await?;
        info!(role = %pending.role, student_id = %pending.ctx.student_id, %account, "account connected");

        self.tokens.connection_status(&pending.ctx, pending.role).await
    }

    /// Number of flows awaiting their redirect.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn is_expired(pending: &PendingConnect, now: DateTime<Utc>) -> bool {
    now - pending.started_at > Duration::minutes(PENDING_TTL_MINUTES)
}

fn exchange_error(err: OAuthClientError) -> DueSyncError {
    if err.requires_reauth() {
        DueSyncError::Auth(format!("authorization code rejected: {err}"))
    } else {
        DueSyncError::Network(format!("token exchange failed: {err}"))
    }
}
