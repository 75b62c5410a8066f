//! Sync pass results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::AccountRole;
use crate::impl_domain_status_conversions;

/// User-visible error taxonomy of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    NotConnected,
    AuthorizationExpired,
    RateLimited,
    TransientNetwork,
    PermanentRejection,
    Timeout,
    /// Local persistence failed after the remote call
    Storage,
}

impl_domain_status_conversions!(SyncErrorKind {
    NotConnected => "not_connected",
    AuthorizationExpired => "authorization_expired",
    RateLimited => "rate_limited",
    TransientNetwork => "transient_network",
    PermanentRejection => "permanent_rejection",
    Timeout => "timeout",
    Storage => "storage",
});

impl SyncErrorKind {
    /// The user has to reconnect; waiting will not help.
    pub const fn requires_user_action(self) -> bool {
        matches!(self, Self::AuthorizationExpired)
    }
}

/// Lifecycle of one student pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Loading,
    Filtering,
    Diffing,
    Applying,
    Done,
    Failed,
}

impl_domain_status_conversions!(PassState {
    Loading => "loading",
    Filtering => "filtering",
    Diffing => "diffing",
    Applying => "applying",
    Done => "done",
    Failed => "failed",
});

/// How a role's portion of the pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleOutcome {
    Completed,
    /// Role sync switched off; nothing touched
    Disabled,
    /// No credentials for this role
    NotConnected,
    /// Refresh failed or a second `Unauthorized`; needs reconnect
    AuthorizationExpired,
    /// Role-level failure such as calendar provisioning
    Aborted,
    /// Pass budget ran out before the role finished
    TimedOut,
}

/// Per-role counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub role: AccountRole,
    pub outcome: RoleOutcome,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub errors: usize,
}

impl RoleSummary {
    pub fn new(role: AccountRole, outcome: RoleOutcome) -> Self {
        Self { role, outcome, created: 0, updated: 0, deleted: 0, unchanged: 0, errors: 0 }
    }
}

/// One failed item or role in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub role: Option<AccountRole>,
    pub assignment_id: Option<String>,
    pub kind: SyncErrorKind,
    pub message: String,
}

/// Outcome of one student pass, returned to the manual-sync caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub pass_id: Uuid,
    pub student_id: String,
    pub state: PassState,
    /// Budget exceeded; counts reflect work finished before cancellation
    pub timed_out: bool,
    pub roles: Vec<RoleSummary>,
    /// Bounded list of error summaries
    pub errors: Vec<ItemError>,
    /// Errors beyond the cap, counted but not listed
    pub suppressed_errors: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncResult {
    pub fn created(&self) -> usize {
        self.roles.iter().map(|r| r.created).sum()
    }

    pub fn updated(&self) -> usize {
        self.roles.iter().map(|r| r.updated).sum()
    }

    pub fn deleted(&self) -> usize {
        self.roles.iter().map(|r| r.deleted).sum()
    }

    /// Total errors, including suppressed ones.
    pub fn error_count(&self) -> usize {
        self.errors.len() + self.suppressed_errors
    }

    /// Create + update + delete calls that succeeded.
    pub fn operation_count(&self) -> usize {
        self.created() + self.updated() + self.deleted()
    }

    pub fn role(&self, role: AccountRole) -> Option<&RoleSummary> {
        self.roles.iter().find(|r| r.role == role)
    }

    /// Roles whose connection must be renewed by the user.
    pub fn roles_requiring_reauth(&self) -> Vec<AccountRole> {
        self.roles
            .iter()
            .filter(|r| r.outcome == RoleOutcome::AuthorizationExpired)
            .map(|r| r.role)
            .collect()
    }
}
