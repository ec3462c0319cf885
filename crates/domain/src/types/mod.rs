//! Domain types and models

pub mod job;

pub use job::{JobEnvelope, JobId, JobMessage};
