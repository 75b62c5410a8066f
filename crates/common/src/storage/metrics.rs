//! Storage metrics tracking
//!
//! Atomic counters for pool activity; read by health checks and logged at
//! pool creation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Connection pool counters.
#[derive(Debug)]
pub struct StorageMetrics {
    /// Number of connections successfully acquired from the pool
    pub connections_acquired: AtomicU64,

    /// Number of connection acquisition timeouts
    pub connections_timeout: AtomicU64,

    /// Number of connection errors
    pub connections_error: AtomicU64,

    total_connection_time_ms: AtomicU64,
    max_pool_size: u32,
}

impl StorageMetrics {
    /// Create a new metrics tracker
    pub fn new(max_pool_size: u32) -> Self {
        Self {
            connections_acquired: AtomicU64::new(0),
            connections_timeout: AtomicU64::new(0),
            connections_error: AtomicU64::new(0),
            total_connection_time_ms: AtomicU64::new(0),
            max_pool_size,
        }
    }

    /// Record a successful connection acquisition
    pub fn record_connection_acquired(&self, duration_ms: u64) {
        self.connections_acquired.fetch_add(1, Ordering::Relaxed);
        self.total_connection_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Record a connection timeout
    pub fn record_connection_timeout(&self) {
        self.connections_timeout.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection error
    pub fn record_connection_error(&self) {
        self.connections_error.fetch_add(1, Ordering::Relaxed);
    }

    /// Average time spent waiting for a connection, in milliseconds
    pub fn avg_connection_time_ms(&self) -> u64 {
        let acquired = self.connections_acquired.load(Ordering::Relaxed);
        if acquired == 0 {
            return 0;
        }
        self.total_connection_time_ms.load(Ordering::Relaxed) / acquired
    }

    /// Configured pool capacity
    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }
}
