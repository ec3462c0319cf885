//! Retry scheduler with explicit lifecycle management.
//!
//! Drives jobs through the delay queue: each poll cycle receives at most one
//! envelope, reconciles it against the clock, runs the job handler when the
//! envelope is due and re-enqueues it when another attempt is needed. The
//! queue's redelivery doubles as the timer, so no retry state lives in this
//! process between cycles.
//!
//! The poll loop runs on one tokio task owned by the scheduler. `start` spawns
//! it, `stop` cancels it and joins with a timeout, and dropping a running
//! scheduler cancels the loop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use delayq_domain::{Config, JobMessage};
//! use delayq_infra::queue::InMemoryQueue;
//! use delayq_infra::scheduling::{FnJobHandler, RetryScheduler, TracingErrorReporter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = Arc::new(InMemoryQueue::new());
//! let handler = Arc::new(FnJobHandler(|job: &JobMessage| job.attempted_count >= 3));
//! let mut scheduler =
//!     RetryScheduler::new(queue, handler, Arc::new(TracingErrorReporter), &Config::default())?;
//!
//! scheduler.start().await?;
//! scheduler.job("invoice-42").await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use delayq_common::{Clock, SystemClock};
use delayq_core::{DelayReconciler, QueueGateway, QueueMessage, Reconciliation};
use delayq_domain::{Config, JobEnvelope, JobId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::handlers::{ErrorReporter, JobHandler};
use crate::observability::SchedulerMetrics;

/// Pause after a failed receive so a dead transport does not spin the loop.
const RECEIVE_ERROR_PAUSE: Duration = Duration::from_secs(1);

/// What a single cycle (or a direct submission) did with its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Long-poll wait elapsed without a message.
    Empty,
    /// Attempt budget already spent; the message is left to dead-letter.
    Exhausted { job_id: JobId, attempted_count: u32 },
    /// Envelope was not yet due and went back into the queue unchanged.
    Rescheduled { job_id: JobId, delay: Duration },
    /// Handler reported completion; the job is retired.
    Completed { job_id: JobId, attempt: u32 },
    /// Handler asked for another attempt; the envelope was re-enqueued.
    Retried { job_id: JobId, attempt: u32, delay: Duration },
    /// A failure was handed to the error reporter and the cycle aborted.
    Failed,
}

/// Everything one cycle needs, shared by the poll task and submitters.
#[derive(Clone)]
struct PollWorker {
    gateway: Arc<dyn QueueGateway>,
    handler: Arc<dyn JobHandler>,
    reporter: Arc<dyn ErrorReporter>,
    reconciler: DelayReconciler,
    max_attempts: u32,
    receive_wait: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<SchedulerMetrics>,
}

impl PollWorker {
    async fn poll_once(&self) -> CycleOutcome {
        let received = self.receive().await;
        self.process_received(received).await
    }

    async fn receive(&self) -> SchedulerResult<Option<QueueMessage>> {
        self.gateway.receive(self.receive_wait).await.map_err(SchedulerError::Receive)
    }

    async fn process_received(
        &self,
        received: SchedulerResult<Option<QueueMessage>>,
    ) -> CycleOutcome {
        self.metrics.record_cycle();
        let message = match received {
            Ok(Some(message)) => message,
            Ok(None) => {
                self.metrics.record_empty_receive();
                return CycleOutcome::Empty;
            }
            Err(err) => return self.fail(err),
        };

        self.metrics.record_received();
        match self.process_message(&message).await {
            Ok(outcome) => outcome,
            Err(err) => self.fail(err),
        }
    }

    #[instrument(skip_all, fields(message_id = %message.message_id))]
    async fn process_message(&self, message: &QueueMessage) -> SchedulerResult<CycleOutcome> {
        let envelope = JobEnvelope::from_body(&message.body).map_err(|source| {
            SchedulerError::Decode { message_id: message.message_id.clone(), source }
        })?;

        if self.max_attempts > 0 && envelope.attempted_count() >= self.max_attempts {
            self.metrics.record_exhausted();
            warn!(
                job_id = %envelope.id(),
                attempted_count = envelope.attempted_count(),
                max_attempts = self.max_attempts,
                "attempt budget exhausted, leaving message for dead-letter redrive"
            );
            return Ok(CycleOutcome::Exhausted {
                job_id: envelope.id().clone(),
                attempted_count: envelope.attempted_count(),
            });
        }

        // Acknowledge before acting, so at most one copy of the envelope is
        // ever live. A failed delete aborts with nothing done; redelivery
        // brings the same envelope back.
        self.gateway.delete(&message.receipt).await.map_err(|source| SchedulerError::Delete {
            message_id: message.message_id.clone(),
            source,
        })?;
        self.metrics.record_deleted();

        self.work_envelope(envelope).await
    }

    /// Reconcile, run if due, and re-enqueue unless the job completed.
    async fn work_envelope(&self, envelope: JobEnvelope) -> SchedulerResult<CycleOutcome> {
        let job_id = envelope.id().clone();
        let now = self.clock.now();
        let reconciliation = self
            .reconciler
            .reconcile(envelope, now)
            .map_err(|source| SchedulerError::Schedule { job_id: job_id.clone(), source })?;

        match reconciliation {
            Reconciliation::NotYetDue { envelope, remaining } => {
                let delay = self.enqueue(&envelope, now).await?;
                debug!(
                    job_id = %job_id,
                    remaining_secs = remaining.as_secs(),
                    delay_secs = delay.as_secs(),
                    "job not yet due, re-enqueued"
                );
                Ok(CycleOutcome::Rescheduled { job_id, delay })
            }
            Reconciliation::Due(envelope) => {
                let attempt = envelope.attempted_count();
                self.metrics.record_invocation();
                let started = Instant::now();
                let complete = self.handler.handle(&envelope.message).await;
                let elapsed_ms = started.elapsed().as_millis();

                if complete {
                    self.metrics.record_completed();
                    info!(job_id = %job_id, attempt, elapsed_ms, "job completed");
                    return Ok(CycleOutcome::Completed { job_id, attempt });
                }

                let delay = self.enqueue(&envelope, self.clock.now()).await?;
                debug!(
                    job_id = %job_id,
                    attempt,
                    elapsed_ms,
                    delay_secs = delay.as_secs(),
                    "job incomplete, retry scheduled"
                );
                Ok(CycleOutcome::Retried { job_id, attempt, delay })
            }
        }
    }

    async fn enqueue(
        &self,
        envelope: &JobEnvelope,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Duration> {
        let send_error = |source| SchedulerError::Send { job_id: envelope.id().clone(), source };
        let body = envelope.to_body().map_err(send_error)?;
        let delay = self.reconciler.enqueue_delay(envelope, now);
        self.gateway.send(&body, delay).await.map_err(send_error)?;
        self.metrics.record_sent();
        Ok(delay)
    }

    async fn submit(&self, id: JobId) -> SchedulerResult<CycleOutcome> {
        let envelope = JobEnvelope::new(id, self.clock.now());
        debug!(job_id = %envelope.id(), "job submitted");
        self.work_envelope(envelope).await
    }

    fn fail(&self, err: SchedulerError) -> CycleOutcome {
        self.metrics.record_error();
        self.reporter.report(&err);
        CycleOutcome::Failed
    }
}

/// Cloneable handle for submitting jobs from any task.
///
/// Holds only shared handles, so submissions run concurrently with the poll
/// loop without further synchronization.
#[derive(Clone)]
pub struct JobSubmitter {
    worker: PollWorker,
}

impl JobSubmitter {
    /// Submit a new job and run its first attempt immediately.
    ///
    /// # Errors
    /// `Schedule` if the next deadline overflows, `Send` if the retry could
    /// not be enqueued. The error is returned, not reported.
    pub async fn job(&self, id: impl Into<JobId>) -> SchedulerResult<CycleOutcome> {
        self.worker.submit(id.into()).await
    }
}

/// Delayed-retry scheduler backed by a [`QueueGateway`].
pub struct RetryScheduler {
    worker: PollWorker,
    stop_timeout: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl RetryScheduler {
    /// Create a scheduler from validated configuration.
    ///
    /// The per-send delay ceiling is the smaller of the configured ceiling and
    /// the gateway's own.
    ///
    /// # Errors
    /// `SchedulerError::Config` if `config` fails validation.
    pub fn new(
        gateway: Arc<dyn QueueGateway>,
        handler: Arc<dyn JobHandler>,
        reporter: Arc<dyn ErrorReporter>,
        config: &Config,
    ) -> SchedulerResult<Self> {
        config.validate().map_err(SchedulerError::Config)?;

        let max_queue_delay = config.queue.max_delay().min(gateway.max_delay());
        let reconciler = DelayReconciler::from_config(&config.retry, &config.queue)
            .with_max_queue_delay(max_queue_delay);

        Ok(Self {
            worker: PollWorker {
                gateway,
                handler,
                reporter,
                reconciler,
                max_attempts: config.retry.max_attempts,
                receive_wait: config.queue.receive_wait(),
                clock: Arc::new(SystemClock),
                metrics: Arc::new(SchedulerMetrics::new()),
            },
            stop_timeout: config.scheduler.stop_timeout(),
            cancellation: CancellationToken::new(),
            task_handle: None,
        })
    }

    /// Replace the wall clock, typically with a `MockClock` in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.worker.clock = clock;
        self
    }

    /// Share an externally owned metrics instance.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<SchedulerMetrics>) -> Self {
        self.worker.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<SchedulerMetrics> {
        Arc::clone(&self.worker.metrics)
    }

    pub fn reconciler(&self) -> &DelayReconciler {
        &self.worker.reconciler
    }

    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter { worker: self.worker.clone() }
    }

    /// Submit a new job and run its first attempt immediately.
    ///
    /// A job that completes on the first attempt never touches the queue.
    pub async fn job(&self, id: impl Into<JobId>) -> SchedulerResult<CycleOutcome> {
        self.worker.submit(id.into()).await
    }

    /// Run a single poll cycle on the caller's task.
    ///
    /// Failures go to the error reporter and yield [`CycleOutcome::Failed`].
    pub async fn poll_once(&self) -> CycleOutcome {
        self.worker.poll_once().await
    }

    /// Start the poll loop on a background task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            receive_wait_secs = self.worker.receive_wait.as_secs(),
            max_attempts = self.worker.max_attempts,
            "Starting retry scheduler"
        );

        self.cancellation = CancellationToken::new();
        let worker = self.worker.clone();
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::poll_loop(worker, cancel).await;
        }));

        info!("Retry scheduler started");
        Ok(())
    }

    /// Stop the poll loop and wait for the task to finish.
    ///
    /// Cancellation is only observed while waiting on the queue, so a handler
    /// invocation in progress runs to completion first.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.task_handle.as_mut() else {
            return Err(SchedulerError::NotRunning);
        };

        info!("Stopping retry scheduler");
        self.cancellation.cancel();

        match tokio::time::timeout(self.stop_timeout, &mut *handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.is_cancelled() => {}
            Ok(Err(e)) => {
                self.task_handle = None;
                warn!(error = %e, "Poll task failed");
                return Err(SchedulerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                // Abort and keep the handle; the task stays tracked until a
                // later stop joins it.
                handle.abort();
                warn!(timeout_secs = self.stop_timeout.as_secs(), "Poll task did not stop in time");
                return Err(SchedulerError::StopTimeout { seconds: self.stop_timeout.as_secs() });
            }
        }
        self.task_handle = None;

        info!("Retry scheduler stopped");
        Ok(())
    }

    /// True while the poll task is alive, including an aborted task that has
    /// not yet wound down.
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn poll_loop(worker: PollWorker, cancel: CancellationToken) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Retry scheduler poll loop cancelled");
                    break;
                }
                received = worker.receive() => received,
            };

            let receive_failed = received.is_err();
            worker.process_received(received).await;

            if receive_failed {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RECEIVE_ERROR_PAUSE) => {}
                }
            }
        }
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("RetryScheduler dropped while running; cancelling poll loop");
            self.cancellation.cancel();
        }
    }
}
