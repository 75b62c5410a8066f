//! Encrypted OAuth credential rows
//!
//! Token columns hold ciphertext produced by the token cipher; this
//! repository never sees plaintext tokens.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duesync_common::storage::error::StorageResult;
use duesync_common::storage::sqlcipher::SqlCipherConnection;
use duesync_core::TokenRepository;
use duesync_domain::{AccountRole, Result as DomainResult, SyncContext, TokenRecord, TokenStatus};
use rusqlite::{params, Row};
use tokio::task;
use tracing::instrument;

use super::manager::DbManager;
use super::{map_join_error, map_storage_error, parsed_column, to_unix, unix_column};

const SELECT_TOKEN: &str = "SELECT user_id, student_id, account_role, encrypted_access,
        encrypted_refresh, expires_at, calendar_id, account_email, status, updated_at
     FROM token_records
     WHERE user_id = ?1 AND student_id = ?2 AND account_role = ?3";

const UPSERT_TOKEN: &str = "INSERT INTO token_records (user_id, student_id, account_role,
        encrypted_access, encrypted_refresh, expires_at, calendar_id, account_email, status,
        updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT(user_id, student_id, account_role) DO UPDATE SET
        encrypted_access = excluded.encrypted_access,
        encrypted_refresh = excluded.encrypted_refresh,
        expires_at = excluded.expires_at,
        calendar_id = excluded.calendar_id,
        account_email = excluded.account_email,
        status = excluded.status,
        updated_at = excluded.updated_at";

const DELETE_TOKEN: &str =
    "DELETE FROM token_records WHERE user_id = ?1 AND student_id = ?2 AND account_role = ?3";

/// SqlCipher-backed [`TokenRepository`]
pub struct SqlCipherTokenRepository {
    db: Arc<DbManager>,
}

impl SqlCipherTokenRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenRepository for SqlCipherTokenRepository {
    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    async fn find_token(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
    ) -> DomainResult<Option<TokenRecord>> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();

        task::spawn_blocking(move || -> DomainResult<Option<TokenRecord>> {
            let conn = db.get_connection()?;
            conn.query_optional(
                SELECT_TOKEN,
                params![ctx.user_id, ctx.student_id, role.as_str()],
                map_token_row,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, record), fields(student_id = %record.student_id, role = %record.role))]
    async fn upsert_token(&self, record: &TokenRecord) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_token(&conn, &record).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    async fn delete_token(&self, ctx: &SyncContext, role: AccountRole) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(DELETE_TOKEN).map_err(map_storage_error)?;
            let deleted = stmt
                .execute(params![ctx.user_id, ctx.student_id, role.as_str()])
                .map_err(map_storage_error)?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, encrypted_access, encrypted_refresh), fields(student_id = %ctx.student_id, role = %role))]
    async fn update_access_token(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        encrypted_access: &str,
        encrypted_refresh: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();
        let encrypted_access = encrypted_access.to_string();
        let encrypted_refresh = encrypted_refresh.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            update_access_token(
                &conn,
                &ctx,
                role,
                &encrypted_access,
                encrypted_refresh.as_deref(),
                expires_at,
            )
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role, status = %status))]
    async fn set_token_status(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        status: TokenStatus,
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "UPDATE token_records SET status = ?4, updated_at = ?5
                     WHERE user_id = ?1 AND student_id = ?2 AND account_role = ?3",
                )
                .map_err(map_storage_error)?;
            let updated = stmt
                .execute(params![
                    ctx.user_id,
                    ctx.student_id,
                    role.as_str(),
                    status.as_str(),
                    to_unix(Utc::now()),
                ])
                .map_err(map_storage_error)?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self), fields(student_id = %ctx.student_id, role = %role))]
    async fn set_calendar_id(
        &self,
        ctx: &SyncContext,
        role: AccountRole,
        calendar_id: &str,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let ctx = ctx.clone();
        let calendar_id = calendar_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "UPDATE token_records SET calendar_id = ?4, updated_at = ?5
                     WHERE user_id = ?1 AND student_id = ?2 AND account_role = ?3",
                )
                .map_err(map_storage_error)?;
            stmt.execute(params![
                ctx.user_id,
                ctx.student_id,
                role.as_str(),
                calendar_id,
                to_unix(Utc::now()),
            ])
            .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_token(conn: &SqlCipherConnection, record: &TokenRecord) -> StorageResult<()> {
    let mut stmt = conn.prepare(UPSERT_TOKEN)?;
    stmt.execute(params![
        record.user_id,
        record.student_id,
        record.role.as_str(),
        record.encrypted_access,
        record.encrypted_refresh,
        to_unix(record.expires_at),
        record.calendar_id,
        record.account_email,
        record.status.as_str(),
        to_unix(record.updated_at),
    ])?;
    Ok(())
}

fn update_access_token(
    conn: &SqlCipherConnection,
    ctx: &SyncContext,
    role: AccountRole,
    encrypted_access: &str,
    encrypted_refresh: Option<&str>,
    expires_at: DateTime<Utc>,
) -> StorageResult<()> {
    // A refresh response without a rotated refresh token keeps the stored one.
    let mut stmt = conn.prepare(
        "UPDATE token_records SET
            encrypted_access = ?4,
            encrypted_refresh = COALESCE(?5, encrypted_refresh),
            expires_at = ?6,
            updated_at = ?7
         WHERE user_id = ?1 AND student_id = ?2 AND account_role = ?3",
    )?;
    stmt.execute(params![
        ctx.user_id,
        ctx.student_id,
        role.as_str(),
        encrypted_access,
        encrypted_refresh,
        to_unix(expires_at),
        to_unix(Utc::now()),
    ])?;
    Ok(())
}

fn map_token_row(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
    Ok(TokenRecord {
        user_id: row.get(0)?,
        student_id: row.get(1)?,
        role: parsed_column(row, 2)?,
        encrypted_access: row.get(3)?,
        encrypted_refresh: row.get(4)?,
        expires_at: unix_column(row, 5)?,
        calendar_id: row.get(6)?,
        account_email: row.get(7)?,
        status: parsed_column(row, 8)?,
        updated_at: unix_column(row, 9)?,
    })
}
