//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database encryption error: {0}")]
    Encryption(String),

    #[error("Wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Returns `true` when the underlying SQLite call found no rows.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Rusqlite(rusqlite::Error::QueryReturnedNoRows))
    }
}

/// Heuristic used while opening a pool: SQLCipher reports a wrong key as a
/// corrupt or non-database file.
pub(crate) fn looks_like_wrong_key(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("file is not a database")
        || lower.contains("file is encrypted")
        || lower.contains("database disk image is malformed")
        || lower.contains("notadb")
}
