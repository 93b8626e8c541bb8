//! Scheduler error types

use cdnbulk_domain::BulkError;
use thiserror::Error;

use crate::errors::InfraError;

/// Background task lifecycle errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    /// The scheduler was shut down and accepts no new work
    #[error("Scheduler shut down")]
    ShutDown,

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let bulk_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning | SchedulerError::ShutDown => {
                BulkError::InvalidInput(err.to_string())
            }
            _ => BulkError::Internal(err.to_string()),
        };
        InfraError(bulk_err)
    }
}

impl From<SchedulerError> for BulkError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
