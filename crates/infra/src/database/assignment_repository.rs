//! Local assignment cache
//!
//! Filled by the LMS fetcher through [`SqlCipherAssignmentRepository::upsert_assignments`]
//! and read by the reconciler through the [`AssignmentSource`] port. Rows
//! only leave the cache on explicit eviction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use duesync_common::storage::error::StorageResult;
use duesync_common::storage::sqlcipher::SqlCipherConnection;
use duesync_core::AssignmentSource;
use duesync_domain::{Assignment, DueSyncError, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;
use tracing::{debug, info, instrument};

use super::manager::DbManager;
use super::{map_join_error, map_sql_error, map_storage_error, optional_unix_column, to_unix};

const SELECT_STUDENT_ASSIGNMENTS: &str = "SELECT student_id, plannable_id, title, course_id,
        course_name, due_at, points_possible, current_grade, submitted, missing, late, graded
     FROM assignments
     WHERE student_id = ?1
     ORDER BY due_at IS NULL, due_at, plannable_id";

const UPSERT_ASSIGNMENT: &str = "INSERT INTO assignments (student_id, plannable_id, title,
        course_id, course_name, due_at, points_possible, current_grade, submitted, missing,
        late, graded, fetched_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
     ON CONFLICT(student_id, plannable_id) DO UPDATE SET
        title = excluded.title,
        course_id = excluded.course_id,
        course_name = excluded.course_name,
        due_at = excluded.due_at,
        points_possible = excluded.points_possible,
        current_grade = excluded.current_grade,
        submitted = excluded.submitted,
        missing = excluded.missing,
        late = excluded.late,
        graded = excluded.graded,
        fetched_at = excluded.fetched_at";

/// SqlCipher-backed assignment cache
pub struct SqlCipherAssignmentRepository {
    db: Arc<DbManager>,
}

impl SqlCipherAssignmentRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or refresh a batch of fetched assignments in one transaction.
    ///
    /// Every assignment must belong to `student_id`.
    #[instrument(skip(self, assignments), fields(count = assignments.len()))]
    pub async fn upsert_assignments(
        &self,
        student_id: &str,
        assignments: &[Assignment],
    ) -> DomainResult<usize> {
        if let Some(foreign) = assignments.iter().find(|a| a.student_id != student_id) {
            return Err(DueSyncError::InvalidInput(format!(
                "assignment {} belongs to another student",
                foreign.plannable_id
            )));
        }

        let db = Arc::clone(&self.db);
        let assignments = assignments.to_vec();

        let written = task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            let fetched_at = to_unix(Utc::now());
            {
                let mut stmt = tx.prepare(UPSERT_ASSIGNMENT).map_err(map_sql_error)?;
                for a in &assignments {
                    stmt.execute(params![
                        a.student_id,
                        a.plannable_id,
                        a.title,
                        a.course_id,
                        a.course_name,
                        a.due_at.map(to_unix),
                        a.points_possible,
                        a.current_grade,
                        a.submitted,
                        a.missing,
                        a.late,
                        a.graded,
                        fetched_at,
                    ])
                    .map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(assignments.len())
        })
        .await
        .map_err(map_join_error)??;

        debug!(written, "assignment cache updated");
        Ok(written)
    }

    /// Drop every cached assignment for a student.
    #[instrument(skip(self))]
    pub async fn evict_student(&self, student_id: &str) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let student_id = student_id.to_string();

        let evicted = task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("DELETE FROM assignments WHERE student_id = ?1")
                .map_err(map_storage_error)?;
            stmt.execute(params![student_id]).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)??;

        info!(evicted, "assignment cache evicted");
        Ok(evicted)
    }
}

#[async_trait]
impl AssignmentSource for SqlCipherAssignmentRepository {
    #[instrument(skip(self))]
    async fn fetch_assignments(&self, student_id: &str) -> DomainResult<Vec<Assignment>> {
        let db = Arc::clone(&self.db);
        let student_id = student_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<Assignment>> {
            let conn = db.get_connection()?;
            query_student_assignments(&conn, &student_id).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_student_assignments(
    conn: &SqlCipherConnection,
    student_id: &str,
) -> StorageResult<Vec<Assignment>> {
    let mut stmt = conn.prepare(SELECT_STUDENT_ASSIGNMENTS)?;
    stmt.query_map(params![student_id], map_assignment_row)
}

fn map_assignment_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        student_id: row.get(0)?,
        plannable_id: row.get(1)?,
        title: row.get(2)?,
        course_id: row.get(3)?,
        course_name: row.get(4)?,
        due_at: optional_unix_column(row, 5)?,
        points_possible: row.get(6)?,
        current_grade: row.get(7)?,
        submitted: row.get(8)?,
        missing: row.get(9)?,
        late: row.get(10)?,
        graded: row.get(11)?,
    })
}
