//! # delayq Domain
//!
//! Domain types for the delayed-retry scheduler.
//!
//! This crate contains:
//! - The job envelope that travels through the delay queue
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other delayq crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
