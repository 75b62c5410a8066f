//! Assignment to calendar-event mappings

use std::sync::Arc;

use async_trait::async_trait;
use duesync_common::storage::error::StorageResult;
use duesync_common::storage::sqlcipher::SqlCipherConnection;
use duesync_core::MappingRepository;
use duesync_domain::{AccountRole, ContentFingerprint, EventMapping, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;
use tracing::{debug, instrument};

use super::manager::DbManager;
use super::{map_join_error, map_storage_error, parsed_column, to_unix, unix_column};

const SELECT_ROLE_MAPPINGS: &str = "SELECT assignment_id, student_id, account_role,
        external_event_id, external_calendar_id, last_synced_at, content_fingerprint
     FROM event_mappings
     WHERE student_id = ?1 AND account_role = ?2
     ORDER BY assignment_id";

const UPSERT_MAPPING: &str = "INSERT INTO event_mappings (assignment_id, student_id,
        account_role, external_event_id, external_calendar_id, last_synced_at,
        content_fingerprint)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(assignment_id, student_id, account_role) DO UPDATE SET
        external_event_id = excluded.external_event_id,
        external_calendar_id = excluded.external_calendar_id,
        last_synced_at = excluded.last_synced_at,
        content_fingerprint = excluded.content_fingerprint";

/// SqlCipher-backed [`MappingRepository`]
pub struct SqlCipherMappingRepository {
    db: Arc<DbManager>,
}

impl SqlCipherMappingRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MappingRepository for SqlCipherMappingRepository {
    #[instrument(skip(self), fields(role = %role))]
    async fn list_mappings(
        &self,
        student_id: &str,
        role: AccountRole,
    ) -> DomainResult<Vec<EventMapping>> {
        let db = Arc::clone(&self.db);
        let student_id = student_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<EventMapping>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(SELECT_ROLE_MAPPINGS).map_err(map_storage_error)?;
            stmt.query_map(params![student_id, role.as_str()], map_mapping_row)
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, mapping), fields(
        student_id = %mapping.student_id,
        role = %mapping.role,
        assignment_id = %mapping.assignment_id
    ))]
    async fn upsert_mapping(&self, mapping: &EventMapping) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let mapping = mapping.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_mapping(&conn, &mapping).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self), fields(role = %role))]
    async fn delete_mapping(
        &self,
        assignment_id: &str,
        student_id: &str,
        role: AccountRole,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let assignment_id = assignment_id.to_string();
        let student_id = student_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "DELETE FROM event_mappings
                     WHERE assignment_id = ?1 AND student_id = ?2 AND account_role = ?3",
                )
                .map_err(map_storage_error)?;
            let deleted = stmt
                .execute(params![assignment_id, student_id, role.as_str()])
                .map_err(map_storage_error)?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self), fields(role = %role))]
    async fn delete_role_mappings(
        &self,
        student_id: &str,
        role: AccountRole,
    ) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let student_id = student_id.to_string();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("DELETE FROM event_mappings WHERE student_id = ?1 AND account_role = ?2")
                .map_err(map_storage_error)?;
            let deleted =
                stmt.execute(params![student_id, role.as_str()]).map_err(map_storage_error)?;
            debug!(deleted, "role mappings removed");
            Ok(deleted)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_mapping(conn: &SqlCipherConnection, mapping: &EventMapping) -> StorageResult<()> {
    let mut stmt = conn.prepare(UPSERT_MAPPING)?;
    stmt.execute(params![
        mapping.assignment_id,
        mapping.student_id,
        mapping.role.as_str(),
        mapping.external_event_id,
        mapping.external_calendar_id,
        to_unix(mapping.last_synced_at),
        mapping.content_fingerprint.as_str(),
    ])?;
    Ok(())
}

fn map_mapping_row(row: &Row<'_>) -> rusqlite::Result<EventMapping> {
    Ok(EventMapping {
        assignment_id: row.get(0)?,
        student_id: row.get(1)?,
        role: parsed_column(row, 2)?,
        external_event_id: row.get(3)?,
        external_calendar_id: row.get(4)?,
        last_synced_at: unix_column(row, 5)?,
        content_fingerprint: ContentFingerprint::from_hex(row.get::<_, String>(6)?),
    })
}
