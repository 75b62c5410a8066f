//! Storage primitives for encrypted databases
//!
//! SQLCipher pool, connection wrappers, storage errors and pool metrics.

pub mod error;
pub mod metrics;
pub mod sqlcipher;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlcipher::{
    apply_connection_pragmas, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig,
};
