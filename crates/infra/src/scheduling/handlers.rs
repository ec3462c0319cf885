//! Caller-supplied capabilities invoked by the retry scheduler.
//!
//! The scheduler never interprets a job: it asks a [`JobHandler`] to run it
//! and reads back a single bit, complete or not. Failures on the scheduler's
//! own side go to an [`ErrorReporter`].

use async_trait::async_trait;
use delayq_common::{ErrorClassification, ErrorSeverity};
use delayq_domain::JobMessage;
use tracing::{error, info, warn};

use super::error::SchedulerError;

/// Runs one attempt of a job.
///
/// Returning `true` retires the job; `false` schedules another attempt.
/// Errors inside the work itself are the handler's business and must be
/// folded into the returned flag.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobMessage) -> bool;
}

/// Adapts a plain closure into a [`JobHandler`].
pub struct FnJobHandler<F>(pub F);

#[async_trait]
impl<F> JobHandler for FnJobHandler<F>
where
    F: Fn(&JobMessage) -> bool + Send + Sync,
{
    async fn handle(&self, job: &JobMessage) -> bool {
        (self.0)(job)
    }
}

/// Receives every recoverable scheduler failure.
///
/// Called inline from the poll loop; must not block for long.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &SchedulerError);
}

/// Adapts a plain closure into an [`ErrorReporter`].
pub struct FnErrorReporter<F>(pub F);

impl<F> ErrorReporter for FnErrorReporter<F>
where
    F: Fn(&SchedulerError) + Send + Sync,
{
    fn report(&self, error: &SchedulerError) {
        (self.0)(error);
    }
}

/// Logs each failure at a level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, err: &SchedulerError) {
        let retryable = err.is_retryable();
        match err.severity() {
            ErrorSeverity::Info => info!(error = %err, retryable, "scheduler notice"),
            ErrorSeverity::Warning => warn!(error = %err, retryable, "scheduler cycle failed"),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                error!(error = %err, retryable, "scheduler cycle failed");
            }
        }
    }
}
