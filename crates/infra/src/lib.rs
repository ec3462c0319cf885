//! # delayq Infrastructure
//!
//! Infrastructure implementations of the core ports and the retry scheduler.
//!
//! This crate contains:
//! - The retry scheduler poll loop ([`scheduling`])
//! - Queue gateways: in-memory, and SQS behind the `sqs` feature ([`queue`])
//! - Configuration loading from env vars and files ([`config`])
//! - Tracing setup and scheduler metrics ([`observability`])
//!
//! ## Architecture
//! - Implements traits defined in `delayq-core`
//! - Depends on `delayq-common`, `delayq-domain` and `delayq-core`
//! - Contains all "impure" code (I/O, timers, network)

pub mod config;
pub mod errors;
pub mod observability;
pub mod queue;
pub mod scheduling;

pub use errors::InfraError;
pub use queue::InMemoryQueue;
#[cfg(feature = "sqs")]
pub use queue::SqsQueue;
pub use scheduling::{
    CycleOutcome, ErrorReporter, FnErrorReporter, FnJobHandler, JobHandler, JobSubmitter,
    RetryScheduler, SchedulerError, SchedulerResult, TracingErrorReporter,
};
