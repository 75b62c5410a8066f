//! Manual sync and assignment cache commands

use chrono::{DateTime, Utc};
use duesync_domain::{
    AccountRole, Assignment, ItemError, Result, RoleSummary, SyncContext, SyncResult,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::utils::command_helpers::execute_command;
use crate::AppContext;

/// Outcome of a manual sync, shaped for the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: Vec<ItemError>,
    /// Errors beyond the reported list
    pub suppressed_errors: usize,
    pub timed_out: bool,
    pub roles: Vec<RoleSummary>,
    /// Roles that need the user to reconnect
    pub reconnect_required: Vec<AccountRole>,
    pub finished_at: DateTime<Utc>,
}

impl From<SyncResult> for SyncReport {
    fn from(result: SyncResult) -> Self {
        Self {
            pass_id: result.pass_id,
            created: result.created(),
            updated: result.updated(),
            deleted: result.deleted(),
            reconnect_required: result.roles_requiring_reauth(),
            errors: result.errors,
            suppressed_errors: result.suppressed_errors,
            timed_out: result.timed_out,
            roles: result.roles,
            finished_at: result.finished_at,
        }
    }
}

/// Run one reconciliation pass now.
///
/// Fails with `SyncInProgress` while another pass for the student runs.
pub async fn trigger_sync(ctx: &AppContext, user_id: &str, student_id: &str) -> Result<SyncReport> {
    execute_command("sync::trigger_sync", || async {
        let sync_ctx = SyncContext::new(user_id, student_id);
        let result = ctx.reconciler.run_pass(&sync_ctx).await?;
        Ok(SyncReport::from(result))
    })
    .await
}

/// Replace cached assignments for a student with a fresh LMS fetch.
pub async fn cache_assignments(
    ctx: &AppContext,
    student_id: &str,
    assignments: Vec<Assignment>,
) -> Result<usize> {
    execute_command("sync::cache_assignments", || async {
        let written = ctx.assignments.upsert_assignments(student_id, &assignments).await?;
        info!(written, "assignments cached");
        Ok(written)
    })
    .await
}

/// Drop the cached assignments for a student.
pub async fn evict_assignments(ctx: &AppContext, student_id: &str) -> Result<usize> {
    execute_command("sync::evict_assignments", || async {
        ctx.assignments.evict_student(student_id).await
    })
    .await
}
