//! SQLCipher pool helpers
//!
//! Builds the shared SQLCipher pool from the database section of the
//! application config and converts storage errors into domain errors.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use duesync_common::storage::sqlcipher::{
    SqlCipherPool as CommonSqlCipherPool, SqlCipherPoolConfig,
};
use duesync_domain::{DatabaseConfig, Result as DomainResult};

use super::map_storage_error;

/// Re-export the common SQLCipher pool so callers can depend on the shared
/// type.
pub type SqlCipherPool = CommonSqlCipherPool;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool settings for the configured pool size. A size of zero is raised to
/// one connection.
pub fn pool_config(database: &DatabaseConfig) -> SqlCipherPoolConfig {
    SqlCipherPoolConfig {
        max_size: database.pool_size.max(1),
        connection_timeout: CONNECTION_TIMEOUT,
        ..SqlCipherPoolConfig::default()
    }
}

/// Open an `Arc<SqlCipherPool>` using domain error semantics.
pub fn create_sqlcipher_pool<P: AsRef<Path>>(
    path: P,
    encryption_key: String,
    config: SqlCipherPoolConfig,
) -> DomainResult<Arc<SqlCipherPool>> {
    SqlCipherPool::new(path.as_ref(), encryption_key, config)
        .map(Arc::new)
        .map_err(map_storage_error)
}
