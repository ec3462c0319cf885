//! Error classification shared across the workspace.
//!
//! Every layer defines its own `thiserror` enum. Implementing
//! [`ErrorClassification`] on those enums lets reporters decide how loudly to
//! log a failure and whether the queue's natural redelivery will retry it.

use std::fmt;

/// Unified severity level for monitoring and log routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected conditions, nothing to act on
    Info,
    /// Degraded but operational
    Warning,
    /// Failure that needs attention
    Error,
    /// System integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Standard interface for classifying errors by their characteristics.
pub trait ErrorClassification {
    /// Whether the failed operation will be (or may safely be) attempted again.
    fn is_retryable(&self) -> bool;

    /// How serious the error is.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error requires immediate attention.
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}
