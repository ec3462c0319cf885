//! Scheduler counters
//!
//! Plain atomic counters, cheap enough to bump on every cycle. Independent
//! counters use `Relaxed`; a snapshot is not a consistent cut across them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one scheduler instance.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    cycles: AtomicU64,
    empty_receives: AtomicU64,
    received: AtomicU64,
    sent: AtomicU64,
    deleted: AtomicU64,
    invocations: AtomicU64,
    completed: AtomicU64,
    exhausted: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`SchedulerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerMetricsSnapshot {
    pub cycles: u64,
    pub empty_receives: u64,
    pub received: u64,
    pub sent: u64,
    pub deleted: u64,
    pub invocations: u64,
    pub completed: u64,
    pub exhausted: u64,
    pub errors: u64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_receive(&self) {
        self.empty_receives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerMetricsSnapshot {
        SchedulerMetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            empty_receives: self.empty_receives.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
