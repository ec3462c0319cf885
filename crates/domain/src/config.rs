//! Configuration structures
//!
//! Every section deserializes with defaults, so a config file only needs the
//! keys it wants to override.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_SEED_SECS, DEFAULT_DUE_TOLERANCE_SECS, DEFAULT_RECEIVE_WAIT_SECS,
    DEFAULT_STOP_TIMEOUT_SECS, MAX_QUEUE_DELAY_SECS, MAX_RECEIVE_WAIT_SECS,
};
use crate::errors::{DelayqError, Result};

/// Scheduler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub retry: RetryConfig,
    pub scheduler: SchedulerConfig,
}

/// Queue endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue identity (SQS queue URL, or any label for the in-memory queue)
    pub url: String,
    pub region: Option<String>,
    /// Custom endpoint for SQS-compatible services (ElasticMQ, LocalStack)
    pub endpoint: Option<String>,
    /// Long-poll wait per receive call
    pub receive_wait_secs: u64,
    /// Ceiling on the delivery delay of a single enqueue
    pub max_delay_secs: u64,
}

/// Retry budget and schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per job, 0 for unlimited
    pub max_attempts: u32,
    pub backoff: BackoffConfig,
    /// Slack under which a received envelope counts as due
    pub due_tolerance_secs: u64,
}

/// Stock backoff shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Constant,
    Linear,
    #[default]
    Exponential,
}

impl std::str::FromStr for BackoffKind {
    type Err = DelayqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(Self::Constant),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            other => Err(DelayqError::Config(format!("Unknown backoff kind: {other}"))),
        }
    }
}

/// Backoff policy as it appears in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub kind: BackoffKind,
    pub seed_secs: u64,
}

/// Poll loop lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How long `stop()` waits for the poll task to finish
    pub stop_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "memory://delayq".to_string(),
            region: None,
            endpoint: None,
            receive_wait_secs: DEFAULT_RECEIVE_WAIT_SECS,
            max_delay_secs: MAX_QUEUE_DELAY_SECS,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            backoff: BackoffConfig::default(),
            due_tolerance_secs: DEFAULT_DUE_TOLERANCE_SECS,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self { kind: BackoffKind::default(), seed_secs: DEFAULT_BACKOFF_SEED_SECS }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { stop_timeout_secs: DEFAULT_STOP_TIMEOUT_SECS }
    }
}

impl QueueConfig {
    pub fn receive_wait(&self) -> Duration {
        Duration::from_secs(self.receive_wait_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl RetryConfig {
    pub fn due_tolerance(&self) -> Duration {
        Duration::from_secs(self.due_tolerance_secs)
    }
}

impl SchedulerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Config {
    /// Reject settings the poll loop cannot honour.
    ///
    /// # Errors
    /// Returns `DelayqError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.queue.receive_wait_secs == 0 {
            return Err(DelayqError::Config(
                "queue.receive_wait_secs must be positive to avoid tight polling".to_string(),
            ));
        }
        if self.queue.receive_wait_secs > MAX_RECEIVE_WAIT_SECS {
            return Err(DelayqError::Config(format!(
                "queue.receive_wait_secs must not exceed {MAX_RECEIVE_WAIT_SECS}"
            )));
        }
        if self.queue.max_delay_secs == 0 {
            return Err(DelayqError::Config("queue.max_delay_secs must be positive".to_string()));
        }
        if self.retry.due_tolerance_secs >= self.queue.max_delay_secs {
            return Err(DelayqError::Config(
                "retry.due_tolerance_secs must be smaller than queue.max_delay_secs".to_string(),
            ));
        }
        if self.scheduler.stop_timeout_secs == 0 {
            return Err(DelayqError::Config(
                "scheduler.stop_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
