//! Shared utilities for the delayq crates.
//!
//! - `time`: clock abstraction used by the scheduler and its tests
//! - `error`: error classification shared by every layer

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod time;

pub use error::{ErrorClassification, ErrorSeverity};
pub use time::{Clock, MockClock, SystemClock};
