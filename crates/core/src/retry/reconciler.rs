//! Delay reconciler
//!
//! Decides, for an envelope just received from the queue, whether the job is
//! due or should rest in the queue a while longer.
//!
//! The envelope stores an absolute `next_attempt_at`, so reconciliation is
//! idempotent: redelivering the same envelope with an unchanged clock always
//! yields the same decision. That is what lets the queue's at-least-once
//! redelivery double as a restart-safe timer.
//!
//! ## Oversized delays
//!
//! A single enqueue cannot ask for more than the queue's delay ceiling
//! (900 seconds on SQS). [`DelayReconciler::enqueue_delay`] caps the delay at
//! the ceiling and the remainder is carried forward: when the message comes
//! back early it is simply not yet due, and is re-enqueued for the rest of
//! its wait. Total time before the next attempt still equals the policy
//! delay, at the cost of one extra round trip per ceiling crossed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use delayq_domain::constants::{DEFAULT_DUE_TOLERANCE_SECS, MAX_QUEUE_DELAY_SECS};
use delayq_domain::{DelayqError, JobEnvelope, QueueConfig, Result, RetryConfig};
use tracing::trace;

use super::backoff::BackoffPolicy;

/// Outcome of reconciling one envelope against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The job should run now. The envelope already carries the incremented
    /// attempt count and the deadline for the attempt after this one.
    Due(JobEnvelope),
    /// The job must keep waiting. The envelope is unchanged.
    NotYetDue { envelope: JobEnvelope, remaining: Duration },
}

impl Reconciliation {
    pub fn envelope(&self) -> &JobEnvelope {
        match self {
            Self::Due(envelope) | Self::NotYetDue { envelope, .. } => envelope,
        }
    }

    pub fn is_due(&self) -> bool {
        matches!(self, Self::Due(_))
    }
}

/// Applies a backoff policy to envelopes as they come back from the queue.
#[derive(Debug, Clone)]
pub struct DelayReconciler {
    policy: BackoffPolicy,
    tolerance: Duration,
    max_queue_delay: Duration,
}

impl DelayReconciler {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            tolerance: Duration::from_secs(DEFAULT_DUE_TOLERANCE_SECS),
            max_queue_delay: Duration::from_secs(MAX_QUEUE_DELAY_SECS),
        }
    }

    pub fn from_config(retry: &RetryConfig, queue: &QueueConfig) -> Self {
        Self::new(retry.backoff.into())
            .with_tolerance(retry.due_tolerance())
            .with_max_queue_delay(queue.max_delay())
    }

    /// Slack under which an envelope counts as due.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Ceiling on a single enqueue delay.
    #[must_use]
    pub fn with_max_queue_delay(mut self, max_queue_delay: Duration) -> Self {
        self.max_queue_delay = max_queue_delay;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    pub fn max_queue_delay(&self) -> Duration {
        self.max_queue_delay
    }

    /// Time left until `next_attempt_at`, zero once it has passed.
    pub fn remaining(envelope: &JobEnvelope, now: DateTime<Utc>) -> Duration {
        (envelope.next_attempt_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Decide whether `envelope` is due at `now`.
    ///
    /// A due envelope has its attempt counter incremented and its deadline
    /// advanced by the policy delay for the new attempt count.
    ///
    /// # Errors
    /// `DelayqError::Schedule` if the attempt counter or the next deadline
    /// would overflow.
    pub fn reconcile(&self, envelope: JobEnvelope, now: DateTime<Utc>) -> Result<Reconciliation> {
        let remaining = Self::remaining(&envelope, now);
        if remaining > self.tolerance {
            trace!(
                job_id = %envelope.id(),
                remaining_secs = remaining.as_secs(),
                "job not yet due"
            );
            return Ok(Reconciliation::NotYetDue { envelope, remaining });
        }

        let mut envelope = envelope;
        let attempt = envelope.attempted_count().checked_add(1).ok_or_else(|| {
            DelayqError::Schedule(format!("attempt counter overflow for job {}", envelope.id()))
        })?;
        let delay = self.policy.delay_for(attempt);
        let next_attempt_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delta| envelope.next_attempt_at.checked_add_signed(delta))
            .ok_or_else(|| {
                DelayqError::Schedule(format!(
                    "backoff delay {delay:?} for attempt {attempt} of job {} is out of range",
                    envelope.id()
                ))
            })?;

        envelope.message.attempted_count = attempt;
        envelope.next_attempt_at = next_attempt_at;
        trace!(
            job_id = %envelope.id(),
            attempt,
            delay_secs = delay.as_secs(),
            "job due"
        );
        Ok(Reconciliation::Due(envelope))
    }

    /// Delivery delay to request when enqueueing `envelope` at `now`.
    ///
    /// Rounded up to whole seconds (queue granularity) so a message never
    /// surfaces before its deadline, then capped at the queue ceiling.
    pub fn enqueue_delay(&self, envelope: &JobEnvelope, now: DateTime<Utc>) -> Duration {
        let remaining = Self::remaining(envelope, now);
        let whole_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Duration::from_secs(whole_secs).min(self.max_queue_delay)
    }
}
