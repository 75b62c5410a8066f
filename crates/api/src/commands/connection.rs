//! Account connection commands

use duesync_domain::{AccountRole, ConnectionStatus, Result, SyncContext};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::ConnectStart;
use crate::utils::command_helpers::execute_command;
use crate::AppContext;

/// Connection state of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleConnection {
    pub role: AccountRole,
    pub status: ConnectionStatus,
}

/// What a disconnect removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectReport {
    pub credentials_removed: bool,
    pub mappings_removed: usize,
}

/// Begin the OAuth flow for one role. Open the returned URL in a browser.
pub async fn start_connect(
    ctx: &AppContext,
    user_id: &str,
    student_id: &str,
    role: AccountRole,
) -> Result<ConnectStart> {
    execute_command("connection::start_connect", || async {
        Ok(ctx.connect.start(&SyncContext::new(user_id, student_id), role))
    })
    .await
}

/// Finish the OAuth flow with the redirect's `state` and `code`.
pub async fn complete_connect(ctx: &AppContext, state: &str, code: &str) -> Result<ConnectionStatus> {
    execute_command("connection::complete_connect", || async {
        ctx.connect.complete(state, code).await
    })
    .await
}

/// Remove a role's credentials and forget its events.
///
/// Refused with `SyncInProgress` while a pass for the student is running.
pub async fn disconnect(
    ctx: &AppContext,
    user_id: &str,
    student_id: &str,
    role: AccountRole,
) -> Result<DisconnectReport> {
    execute_command("connection::disconnect", || async {
        let removed =
            ctx.reconciler.disconnect_role(&SyncContext::new(user_id, student_id), role).await?;
        info!(
            %role,
            credentials_removed = removed.credentials_removed,
            mappings_removed = removed.mappings_removed,
            "account disconnected"
        );

        Ok(DisconnectReport {
            credentials_removed: removed.credentials_removed,
            mappings_removed: removed.mappings_removed,
        })
    })
    .await
}

/// Connection state of both roles.
pub async fn connection_status(
    ctx: &AppContext,
    user_id: &str,
    student_id: &str,
) -> Result<Vec<RoleConnection>> {
    execute_command("connection::connection_status", || async {
        let sync_ctx = SyncContext::new(user_id, student_id);
        let mut connections = Vec::with_capacity(AccountRole::ALL.len());
        for role in AccountRole::ALL {
            let status = ctx.tokens.connection_status(&sync_ctx, role).await?;
            connections.push(RoleConnection { role, status });
        }
        Ok(connections)
    })
    .await
}
