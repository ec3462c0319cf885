//! # delayq Core
//!
//! Pure retry logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Backoff policies (attempt number → delay)
//! - The delay reconciler that decides whether a received job is due
//! - Port interfaces (traits) for the delay queue
//!
//! ## Architecture Principles
//! - Only depends on `delayq-domain`
//! - No network or platform code
//! - All external dependencies via traits

pub mod queue;
pub mod retry;

pub use queue::ports::{MessageId, QueueGateway, QueueMessage, ReceiptHandle};
pub use retry::backoff::BackoffPolicy;
pub use retry::reconciler::{DelayReconciler, Reconciliation};
