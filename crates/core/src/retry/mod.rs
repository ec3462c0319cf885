//! Retry schedule computation
//!
//! `backoff` maps an attempt number to a delay; `reconciler` applies that
//! mapping to a job envelope each time the queue hands it back.

pub mod backoff;
pub mod reconciler;
