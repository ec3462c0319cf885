//! Scheduler error types

use delayq_common::{ErrorClassification, ErrorSeverity};
use delayq_core::MessageId;
use delayq_domain::{DelayqError, JobId};
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
///
/// Everything except the lifecycle variants is recoverable: it is handed to
/// the error reporter and the poll loop moves on to the next cycle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Configuration rejected at construction
    #[error("Invalid scheduler configuration: {0}")]
    Config(#[source] DelayqError),

    /// Long-poll receive failed
    #[error("Failed to receive queue message: {0}")]
    Receive(#[source] DelayqError),

    /// Message body is not a job envelope
    #[error("Failed to decode queue message {message_id}: {source}")]
    Decode { message_id: MessageId, source: DelayqError },

    /// Backoff schedule could not be advanced
    #[error("Failed to schedule job {job_id}: {source}")]
    Schedule { job_id: JobId, source: DelayqError },

    /// Envelope could not be enqueued
    #[error("Failed to enqueue job {job_id}: {source}")]
    Send { job_id: JobId, source: DelayqError },

    /// Delivery could not be acknowledged
    #[error("Failed to delete queue message {message_id}: {source}")]
    Delete { message_id: MessageId, source: DelayqError },

    /// Poll task did not wind down in time
    #[error("Poll task did not stop within {seconds}s")]
    StopTimeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl ErrorClassification for SchedulerError {
    /// Transport failures are transient; the same call may succeed later.
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Receive(_) | Self::Send { .. } | Self::Delete { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AlreadyRunning | Self::NotRunning => ErrorSeverity::Info,
            Self::Receive(_) | Self::Send { .. } | Self::Delete { .. } => ErrorSeverity::Warning,
            Self::Config(_) | Self::Decode { .. } | Self::Schedule { .. } => ErrorSeverity::Error,
            Self::StopTimeout { .. } | Self::TaskJoinFailed(_) => ErrorSeverity::Critical,
        }
    }
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let delayq_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                DelayqError::InvalidInput(err.to_string())
            }
            SchedulerError::Config(ref source) => source.clone(),
            SchedulerError::Receive(_)
            | SchedulerError::Send { .. }
            | SchedulerError::Delete { .. } => DelayqError::Queue(err.to_string()),
            SchedulerError::Decode { .. } => DelayqError::Serialization(err.to_string()),
            SchedulerError::Schedule { .. } => DelayqError::Schedule(err.to_string()),
            SchedulerError::StopTimeout { .. } | SchedulerError::TaskJoinFailed(_) => {
                DelayqError::Internal(err.to_string())
            }
        };
        InfraError(delayq_err)
    }
}

impl From<SchedulerError> for DelayqError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
