//! Scheduling infrastructure
//!
//! The auto-sync scheduler drives periodic reconciliation passes. It
//! follows the runtime rules shared by all background work here:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations

pub mod auto_sync;
pub mod error;

pub use auto_sync::{AutoSyncScheduler, AutoSyncSchedulerConfig, AutoSyncSummary};
pub use error::{SchedulerError, SchedulerResult};
