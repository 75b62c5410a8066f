//! Sync settings commands

use duesync_domain::constants::MAX_REMINDERS;
use duesync_domain::{DueSyncError, Result, SyncContext, SyncSettings};
use tracing::debug;

use crate::utils::command_helpers::execute_command;
use crate::AppContext;

/// Longest reminder Google Calendar accepts (four weeks).
const MAX_REMINDER_MINUTES: u32 = 40_320;

/// Stored settings for the pair, or the defaults when none were saved.
pub async fn get_settings(ctx: &AppContext, user_id: &str, student_id: &str) -> Result<SyncSettings> {
    execute_command("settings::get_settings", || async {
        let sync_ctx = SyncContext::new(user_id, student_id);
        Ok(ctx
            .settings
            .get_settings(&sync_ctx)
            .await?
            .unwrap_or_else(|| SyncSettings::defaults(user_id, student_id)))
    })
    .await
}

/// Validate, normalize and persist settings. Returns what was stored.
///
/// Reminder lists are deduplicated and sorted descending. Changes take
/// effect on the next pass.
pub async fn update_settings(ctx: &AppContext, settings: SyncSettings) -> Result<SyncSettings> {
    execute_command("settings::update_settings", || async {
        let settings = normalize_settings(settings)?;
        ctx.settings.save_settings(&settings).await?;
        debug!(student_id = %settings.student_id, "settings saved");
        Ok(settings)
    })
    .await
}

fn normalize_settings(mut settings: SyncSettings) -> Result<SyncSettings> {
    if settings.user_id.trim().is_empty() || settings.student_id.trim().is_empty() {
        return Err(DueSyncError::InvalidInput("user_id and student_id are required".into()));
    }
    settings.parent_reminders = normalize_reminders("parent_reminders", settings.parent_reminders)?;
    settings.student_reminders = normalize_reminders("student_reminders", settings.student_reminders)?;
    Ok(settings)
}

fn normalize_reminders(field: &str, mut minutes: Vec<u32>) -> Result<Vec<u32>> {
    minutes.sort_unstable_by(|a, b| b.cmp(a));
    minutes.dedup();

    if minutes.len() > MAX_REMINDERS {
        return Err(DueSyncError::InvalidInput(format!(
            "{field} allows at most {MAX_REMINDERS} reminders"
        )));
    }
    if let Some(too_far) = minutes.iter().find(|m| **m > MAX_REMINDER_MINUTES) {
        return Err(DueSyncError::InvalidInput(format!(
            "{field}: {too_far} minutes exceeds the {MAX_REMINDER_MINUTES} minute limit"
        )));
    }
    Ok(minutes)
}
