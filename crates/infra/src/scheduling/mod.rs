//! Retry scheduling on top of the delay queue
//!
//! - [`RetryScheduler`]: owns the poll loop (explicit start/stop)
//! - [`JobSubmitter`]: cloneable handle for submitting jobs concurrently
//! - [`JobHandler`] / [`ErrorReporter`]: caller-supplied capabilities
//!
//! The poll loop follows the workspace runtime rules:
//! - Join handle tracked for the spawned task
//! - Cancellation token support
//! - Timeout on join when stopping
//! - Structured tracing with `SchedulerMetrics` integration

pub mod error;
pub mod handlers;
pub mod retry_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use handlers::{ErrorReporter, FnErrorReporter, FnJobHandler, JobHandler, TracingErrorReporter};
pub use retry_scheduler::{CycleOutcome, JobSubmitter, RetryScheduler};
