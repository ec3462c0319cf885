//! Queue gateway implementations
//!
//! - [`InMemoryQueue`]: in-process, wall-clock or simulated time
//! - [`SqsQueue`]: Amazon SQS (feature `sqs`)

pub mod memory;
#[cfg(feature = "sqs")]
pub mod sqs;

pub use memory::InMemoryQueue;
#[cfg(feature = "sqs")]
pub use sqs::SqsQueue;
