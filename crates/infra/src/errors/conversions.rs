//! Conversions from external infrastructure errors into domain errors.
//!
//! Repositories and the keychain store return `DueSyncError`; the `InfraError`
//! newtype keeps the `From` impls for foreign error types on this side of
//! the crate boundary.

use duesync_common::storage::StorageError;
use duesync_domain::DueSyncError;
use keyring::Error as KeyringError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Domain error produced from an infrastructure failure.
#[derive(Debug)]
pub struct InfraError(pub DueSyncError);

impl From<InfraError> for DueSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DueSyncError> for InfraError {
    fn from(value: DueSyncError) -> Self {
        Self(value)
    }
}

// =============================================================================
// SQLite / SQLCipher
// =============================================================================

impl From<SqlError> for InfraError {
    fn from(err: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;

        let mapped = match err {
            SqlError::SqliteFailure(failure, message) => {
                let message = message.unwrap_or_default();
                match (failure.code, failure.extended_code) {
                    (ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked, _) => {
                        DueSyncError::Database(format!("database is busy: {message}"))
                    }
                    // SQLITE_CONSTRAINT_PRIMARYKEY / SQLITE_CONSTRAINT_UNIQUE
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        DueSyncError::Database("duplicate key".into())
                    }
                    (ErrorCode::NotADatabase, _) => DueSyncError::Security(
                        "database key rejected or file is not encrypted".into(),
                    ),
                    (code, extended) => {
                        DueSyncError::Database(format!("sqlite {code:?} ({extended}): {message}"))
                    }
                }
            }
            SqlError::QueryReturnedNoRows => DueSyncError::NotFound("no matching row".into()),
            SqlError::FromSqlConversionFailure(column, _, cause) => {
                DueSyncError::Database(format!("column {column} could not be decoded: {cause}"))
            }
            SqlError::InvalidColumnType(column, name, ty) => {
                DueSyncError::Database(format!("column {column} ({name}) has type {ty}"))
            }
            other => DueSyncError::Database(other.to_string()),
        };
        Self(mapped)
    }
}

impl From<StorageError> for InfraError {
    fn from(err: StorageError) -> Self {
        let mapped = match err {
            StorageError::Rusqlite(sql) => return Self::from(sql),
            StorageError::WrongKeyOrNotEncrypted => {
                DueSyncError::Security("database key rejected or file is not encrypted".into())
            }
            StorageError::Timeout(seconds) => {
                DueSyncError::Database(format!("timed out after {seconds}s waiting for a connection"))
            }
            other => DueSyncError::Database(other.to_string()),
        };
        Self(mapped)
    }
}

impl From<JoinError> for InfraError {
    fn from(err: JoinError) -> Self {
        if err.is_cancelled() {
            Self(DueSyncError::Internal("blocking database task cancelled".into()))
        } else {
            Self(DueSyncError::Internal(format!("blocking database task failed: {err}")))
        }
    }
}

// =============================================================================
// Keychain
// =============================================================================

impl From<KeyringError> for InfraError {
    fn from(err: KeyringError) -> Self {
        let mapped = match err {
            KeyringError::NoEntry => DueSyncError::NotFound("keychain entry not found".into()),
            KeyringError::NoStorageAccess(cause) => {
                DueSyncError::Security(format!("secure storage unavailable: {cause}"))
            }
            KeyringError::PlatformFailure(cause) => {
                DueSyncError::Security(format!("keychain failure: {cause}"))
            }
            other => DueSyncError::Security(other.to_string()),
        };
        Self(mapped)
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};

    use super::*;

    fn domain(err: impl Into<InfraError>) -> DueSyncError {
        err.into().into()
    }

    #[test]
    fn busy_database_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        assert!(matches!(domain(err), DueSyncError::Database(msg) if msg.contains("busy")));
    }

    #[test]
    fn wrong_key_maps_to_security_error() {
        assert!(matches!(domain(StorageError::WrongKeyOrNotEncrypted), DueSyncError::Security(_)));
    }

    #[test]
    fn missing_keychain_entry_is_not_found() {
        assert!(matches!(domain(KeyringError::NoEntry), DueSyncError::NotFound(_)));
    }
}
