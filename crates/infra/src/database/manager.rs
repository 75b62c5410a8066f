//! Database connection manager backed by the shared SQLCipher pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use duesync_common::storage::sqlcipher::SqlCipherConnection;
use duesync_domain::{DatabaseConfig, DueSyncError, Result};
use rusqlite::params;
use tracing::{debug, info, instrument};

use super::sqlcipher_pool::{create_sqlcipher_pool, pool_config, SqlCipherPool};
use super::{map_sql_error, map_storage_error};

/// Current schema version written by [`DbManager::run_migrations`].
pub const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlCipherPool`].
pub struct DbManager {
    pool: Arc<SqlCipherPool>,
    path: PathBuf,
}

impl std::fmt::Debug for DbManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbManager").field("path", &self.path).finish_non_exhaustive()
    }
}

impl DbManager {
    /// Open the database with the given pool size and SQLCipher key.
    ///
    /// The key is mandatory; plaintext databases are never opened.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let database = DatabaseConfig {
            path: db_path.as_ref().display().to_string(),
            pool_size,
            encryption_key: encryption_key.map(str::to_owned),
        };
        Self::from_config(&database)
    }

    /// Open the database described by the `database` config section.
    pub fn from_config(database: &DatabaseConfig) -> Result<Self> {
        let key = database
            .encryption_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DueSyncError::Security("database encryption key not provided".into()))?;

        let path = PathBuf::from(&database.path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DueSyncError::Database(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let pool = create_sqlcipher_pool(&path, key, pool_config(database))?;

        info!(
            db_path = %path.display(),
            max_connections = pool.metrics().max_pool_size(),
            "sqlcipher pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying SQLCipher pool.
    pub fn pool(&self) -> &Arc<SqlCipherPool> {
        &self.pool
    }

    /// Acquire a SQLCipher connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get_sqlcipher_connection().map_err(map_storage_error)
    }

    /// Create any missing tables and record the schema version.
    #[instrument(skip(self), fields(db_path = %self.path.display()))]
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO schema_version (version, applied_at)
                 VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
                params![SCHEMA_VERSION],
            )
            .map_err(map_sql_error)?;
        if inserted > 0 {
            info!(version = SCHEMA_VERSION, "schema created");
        } else {
            debug!(version = SCHEMA_VERSION, "schema up to date");
        }
        Ok(())
    }

    /// Highest schema version applied to this database.
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT MAX(version) FROM schema_version", &[], |row| row.get(0))
            .map_err(map_storage_error)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify a pooled connection can run a trivial query.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", &[], |row| row.get::<_, i32>(0)).map_err(map_storage_error)?;
        Ok(())
    }
}
