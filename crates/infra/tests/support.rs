//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use delayq_common::MockClock;
use delayq_core::QueueGateway;
use delayq_domain::{BackoffConfig, BackoffKind, Config, JobMessage};
use delayq_infra::queue::InMemoryQueue;
use delayq_infra::scheduling::{
    CycleOutcome, FnErrorReporter, FnJobHandler, RetryScheduler, SchedulerError,
};
use parking_lot::Mutex;

/// Upper bound on empty long-polls before a test gives up waiting.
const MAX_EMPTY_POLLS: usize = 1_000;

pub fn config(max_attempts: u32, kind: BackoffKind, seed_secs: u64) -> Config {
    let mut config = Config::default();
    config.retry.max_attempts = max_attempts;
    config.retry.backoff = BackoffConfig { kind, seed_secs };
    config
}

/// Scheduler wired to a simulated-time queue, recording every handler call
/// and every reported error (rendered).
pub struct Scenario {
    pub clock: MockClock,
    pub queue: Arc<InMemoryQueue>,
    pub calls: Arc<Mutex<Vec<JobMessage>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
    pub scheduler: RetryScheduler,
}

impl Scenario {
    pub fn new<F>(config: Config, complete: F) -> Self
    where
        F: Fn(&JobMessage) -> bool + Send + Sync + 'static,
    {
        let clock = MockClock::new();
        let queue = Arc::new(InMemoryQueue::simulated(clock.clone()));
        Self::with_queue(config, clock, queue, complete)
    }

    pub fn with_queue<F>(
        config: Config,
        clock: MockClock,
        queue: Arc<InMemoryQueue>,
        complete: F,
    ) -> Self
    where
        F: Fn(&JobMessage) -> bool + Send + Sync + 'static,
    {
        let gateway: Arc<dyn QueueGateway> = queue.clone();
        Self::with_gateway(config, clock, queue, gateway, complete)
    }

    pub fn with_gateway<F>(
        config: Config,
        clock: MockClock,
        queue: Arc<InMemoryQueue>,
        gateway: Arc<dyn QueueGateway>,
        complete: F,
    ) -> Self
    where
        F: Fn(&JobMessage) -> bool + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&calls);
        let handler = FnJobHandler(move |job: &JobMessage| {
            seen.lock().push(job.clone());
            complete(job)
        });
        let sink = Arc::clone(&errors);
        let reporter = FnErrorReporter(move |err: &SchedulerError| {
            sink.lock().push(err.to_string());
        });

        let scheduler = RetryScheduler::new(gateway, Arc::new(handler), Arc::new(reporter), &config)
            .expect("valid scheduler config")
            .with_clock(Arc::new(clock.clone()));

        Self { clock, queue, calls, errors, scheduler }
    }

    pub fn invocations(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn queue_ops(&self) -> (u64, u64, u64) {
        (self.queue.sends(), self.queue.receives(), self.queue.deletes())
    }

    /// Poll until a cycle does something other than an empty receive.
    pub async fn next_outcome(&self) -> CycleOutcome {
        for _ in 0..MAX_EMPTY_POLLS {
            let outcome = self.scheduler.poll_once().await;
            if outcome != CycleOutcome::Empty {
                return outcome;
            }
        }
        panic!("no message surfaced within {MAX_EMPTY_POLLS} polls");
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}
