//! Observability infrastructure for logging and scheduler metrics
//!
//! - [`init_tracing`] installs the process-wide `tracing` subscriber
//! - [`metrics::SchedulerMetrics`] counts what the poll loop does

pub mod metrics;

use tracing_subscriber::EnvFilter;

pub use metrics::{SchedulerMetrics, SchedulerMetricsSnapshot};

/// Initialize tracing/logging for the process.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. With `json` set,
/// events are emitted as one JSON object per line.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}
