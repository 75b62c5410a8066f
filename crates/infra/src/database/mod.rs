//! SQLCipher-backed persistence
//!
//! Every repository follows the same shape: the async port method clones
//! the `Arc<DbManager>`, runs synchronous SQL on `spawn_blocking`, and maps
//! storage failures into `DueSyncError`.

pub mod assignment_repository;
pub mod manager;
pub mod mapping_repository;
pub mod settings_repository;
pub mod sqlcipher_pool;
pub mod token_repository;

use chrono::{DateTime, Utc};
use duesync_common::storage::StorageError;
use duesync_domain::DueSyncError;
use rusqlite::types::Type;
use rusqlite::Row;
use tokio::task::JoinError;

pub use assignment_repository::SqlCipherAssignmentRepository;
pub use manager::{DbManager, SCHEMA_VERSION};
pub use mapping_repository::SqlCipherMappingRepository;
pub use settings_repository::SqlCipherSettingsRepository;
pub use sqlcipher_pool::{create_sqlcipher_pool, pool_config, SqlCipherPool};
pub use token_repository::SqlCipherTokenRepository;

use crate::errors::InfraError;

pub(crate) fn map_storage_error(err: StorageError) -> DueSyncError {
    InfraError::from(err).into()
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> DueSyncError {
    InfraError::from(err).into()
}

pub(crate) fn map_join_error(err: JoinError) -> DueSyncError {
    InfraError::from(err).into()
}

// ============================================================================
// Column codecs
// ============================================================================

/// Timestamps are stored as unix seconds.
pub(crate) fn to_unix(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub(crate) fn unix_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| out_of_range(idx, Type::Integer, secs))
}

pub(crate) fn optional_unix_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let secs: Option<i64> = row.get(idx)?;
    secs.map(|secs| {
        DateTime::from_timestamp(secs, 0).ok_or_else(|| out_of_range(idx, Type::Integer, secs))
    })
    .transpose()
}

/// Parse a text column through `FromStr`, reporting failures as conversion
/// errors on that column.
pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("{raw}: {e}").into())
    })
}

/// Decode a JSON array column.
pub(crate) fn json_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn out_of_range(idx: usize, ty: Type, value: i64) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, format!("timestamp {value} out of range").into())
}
