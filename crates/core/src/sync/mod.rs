//! Assignment to calendar reconciliation

pub mod locks;
pub mod plan;
pub mod ports;
pub mod reconciler;
pub mod retry;

pub use locks::{StudentLockGuard, StudentLocks};
pub use ports::*;
pub use reconciler::{ReconcilerOptions, RoleDisconnect, SyncReconciler};
pub use retry::{RetryDecision, RetryPolicy};
