//! SQLCipher connection pool
//!
//! r2d2 pool whose connection manager applies the SQLCipher key and the
//! connection pragmas every time a new connection is opened.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{looks_like_wrong_key, StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;

/// SQLCipher connection pool
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlCipherPool {
    /// Create a new SQLCipher connection pool
    ///
    /// Opens a test connection to verify the key before returning.
    ///
    /// # Errors
    /// Returns `WrongKeyOrNotEncrypted` if the key does not open an existing
    /// database, or `Connection` if the pool cannot be built.
    #[instrument(skip(encryption_key), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!("Creating SQLCipher connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));
        let cipher_config = SqlCipherConfig::new(encryption_key);
        let pool_config = config.clone();

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                classify_open_error(&e, "Failed to create pool")
            })?;

        {
            let conn = pool.get().map_err(|e| {
                warn!("Failed to get test connection: {}", e);
                classify_open_error(&e, "Failed to get test connection")
            })?;
            verify_encryption(&conn)?;
            debug!("Encryption verified successfully");
        }

        info!("SQLCipher pool created successfully with {} connections", config.max_size);

        Ok(Self { pool, config, metrics })
    }

    /// Get the pool metrics
    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    /// Check a connection out of the pool.
    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        let start = std::time::Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.metrics.record_connection_acquired(duration_ms);
                debug!("Connection acquired in {}ms", duration_ms);
                Ok(SqlCipherConnection::new(conn))
            }
            Err(e) => {
                if e.to_string().to_lowercase().contains("timed out") {
                    self.metrics.record_connection_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {}", e)))
                }
            }
        }
    }

    /// Number of open and idle connections.
    pub fn state(&self) -> (u32, u32) {
        let state = self.pool.state();
        (state.connections, state.idle_connections)
    }
}

fn classify_open_error(err: &r2d2::Error, context: &str) -> StorageError {
    if looks_like_wrong_key(&err.to_string()) {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(format!("{context}: {err}"))
    }
}
