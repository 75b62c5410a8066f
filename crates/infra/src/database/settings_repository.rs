//! Per-student sync settings
//!
//! List-valued preferences are typed in memory and stored as JSON arrays.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use duesync_common::storage::error::StorageResult;
use duesync_common::storage::sqlcipher::SqlCipherConnection;
use duesync_core::SettingsRepository;
use duesync_domain::{DueSyncError, Result as DomainResult, SyncContext, SyncSettings};
use rusqlite::{params, Row};
use tokio::task;
use tracing::instrument;

use super::manager::DbManager;
use super::{json_column, map_join_error, map_storage_error, to_unix};

const SELECT_SETTINGS: &str = "SELECT user_id, student_id, sync_enabled, sync_to_parent,
        sync_to_student, parent_reminders, student_reminders, included_courses, excluded_types,
        sync_completed, auto_sync
     FROM sync_settings WHERE user_id = ?1 AND student_id = ?2";

const UPSERT_SETTINGS: &str = "INSERT INTO sync_settings (user_id, student_id, sync_enabled,
        sync_to_parent, sync_to_student, parent_reminders, student_reminders, included_courses,
        excluded_types, sync_completed, auto_sync, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
     ON CONFLICT(user_id, student_id) DO UPDATE SET
        sync_enabled = excluded.sync_enabled,
        sync_to_parent = excluded.sync_to_parent,
        sync_to_student = excluded.sync_to_student,
        parent_reminders = excluded.parent_reminders,
        student_reminders = excluded.student_reminders,
        included_courses = excluded.included_courses,
        excluded_types = excluded.excluded_types,
        sync_completed = excluded.sync_completed,
        auto_sync = excluded.auto_sync,
        updated_at = excluded.updated_at";

const SELECT_AUTO_SYNC_TARGETS: &str = "SELECT user_id, student_id FROM sync_settings
     WHERE sync_enabled = 1 AND auto_sync = 1
     ORDER BY user_id, student_id";

/// SqlCipher-backed [`SettingsRepository`]
pub struct SqlCipherSettingsRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSettingsRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsRepository for SqlCipherSettingsRepository {
    #[instrument(skip(self), fields(student_id = %ctx.student_id))]
    async fn get_settings(&self, ctx: &SyncContext) -> DomainResult<Option<SyncSettings>> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();

        task::spawn_blocking(move || -> DomainResult<Option<SyncSettings>> {
            let conn = db.get_connection()?;
            conn.query_optional(
                SELECT_SETTINGS,
                params![ctx.user_id, ctx.student_id],
                map_settings_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, settings), fields(student_id = %settings.student_id))]
    async fn save_settings(&self, settings: &SyncSettings) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let row = SettingsRow::encode(settings)?;

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_settings(&conn, &row).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn list_auto_sync_targets(&self) -> DomainResult<Vec<SyncContext>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncContext>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(SELECT_AUTO_SYNC_TARGETS).map_err(map_storage_error)?;
            stmt.query_map(params![], |row| {
                Ok(SyncContext { user_id: row.get(0)?, student_id: row.get(1)? })
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Settings with list columns already JSON-encoded.
struct SettingsRow {
    settings: SyncSettings,
    parent_reminders: String,
    student_reminders: String,
    included_courses: String,
    excluded_types: String,
}

impl SettingsRow {
    fn encode(settings: &SyncSettings) -> DomainResult<Self> {
        Ok(Self {
            parent_reminders: to_json(&settings.parent_reminders)?,
            student_reminders: to_json(&settings.student_reminders)?,
            included_courses: to_json(&settings.included_courses)?,
            excluded_types: to_json(&settings.excluded_types)?,
            settings: settings.clone(),
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string(value)
        .map_err(|e| DueSyncError::Internal(format!("failed to encode settings list: {e}")))
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_settings(conn: &SqlCipherConnection, row: &SettingsRow) -> StorageResult<()> {
    let s = &row.settings;
    let mut stmt = conn.prepare(UPSERT_SETTINGS)?;
    stmt.execute(params![
        s.user_id,
        s.student_id,
        s.sync_enabled,
        s.sync_to_parent,
        s.sync_to_student,
        row.parent_reminders,
        row.student_reminders,
        row.included_courses,
        row.excluded_types,
        s.sync_completed_assignments,
        s.auto_sync_enabled,
        to_unix(Utc::now()),
    ])?;
    Ok(())
}

fn map_settings_row(row: &Row<'_>) -> rusqlite::Result<SyncSettings> {
    Ok(SyncSettings {
        user_id: row.get(0)?,
        student_id: row.get(1)?,
        sync_enabled: row.get(2)?,
        sync_to_parent: row.get(3)?,
        sync_to_student: row.get(4)?,
        parent_reminders: json_column(row, 5)?,
        student_reminders: json_column(row, 6)?,
        included_courses: json_column(row, 7)?,
        excluded_types: json_column(row, 8)?,
        sync_completed_assignments: row.get(9)?,
        auto_sync_enabled: row.get(10)?,
    })
}
