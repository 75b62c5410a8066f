//! Scheduler error types

use duesync_domain::DueSyncError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Failed to create scheduler
    #[error("Failed to create scheduler: {0}")]
    CreationFailed(String),

    /// Failed to start scheduler
    #[error("Failed to start scheduler: {0}")]
    StartFailed(String),

    /// Failed to stop scheduler
    #[error("Failed to stop scheduler: {0}")]
    StopFailed(String),

    /// Cron expression rejected or job could not be added
    #[error("Failed to register job: {0}")]
    JobRegistrationFailed(String),

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl SchedulerError {
    pub(crate) fn creation(err: JobSchedulerError) -> Self {
        Self::CreationFailed(err.to_string())
    }

    pub(crate) fn registration(err: JobSchedulerError) -> Self {
        Self::JobRegistrationFailed(err.to_string())
    }
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let mapped = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                DueSyncError::InvalidInput(err.to_string())
            }
            SchedulerError::JobRegistrationFailed(_) => DueSyncError::Config(err.to_string()),
            _ => DueSyncError::Internal(err.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<SchedulerError> for DueSyncError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
