//! In-process delay queue
//!
//! Implements [`QueueGateway`] with the delivery semantics of a hosted delay
//! queue: per-message delivery delay, a visibility timeout after each receive,
//! and optional redrive into a dead-letter list once a message has been
//! received `max_receive_count` times without being deleted.
//!
//! Two timing modes:
//! - [`InMemoryQueue::new`] follows the wall clock and long-polls with tokio
//!   timers.
//! - [`InMemoryQueue::simulated`] shares a [`MockClock`] with the caller. A
//!   long-poll `receive(wait)` advances that clock instead of sleeping: to the
//!   first message that becomes visible within `wait`, or by the whole wait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use delayq_common::{Clock, MockClock, SystemClock};
use delayq_core::{MessageId, QueueGateway, QueueMessage, ReceiptHandle};
use delayq_domain::constants::MAX_QUEUE_DELAY_SECS;
use delayq_domain::{DelayqError, Result};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct StoredMessage {
    id: MessageId,
    body: String,
    visible_at: DateTime<Utc>,
    receive_count: u32,
    receipt: Option<ReceiptHandle>,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: Vec<StoredMessage>,
    dead_letters: Vec<QueueMessage>,
    sends: u64,
    receives: u64,
    deletes: u64,
}

impl QueueState {
    /// Hand out the earliest visible message, redriving any that used up
    /// their receive allowance.
    fn take_visible(
        &mut self,
        now: DateTime<Utc>,
        visibility_timeout: chrono::Duration,
        max_receive_count: Option<u32>,
    ) -> Option<QueueMessage> {
        loop {
            let idx = self
                .messages
                .iter()
                .enumerate()
                .filter(|(_, m)| m.visible_at <= now)
                .min_by_key(|(_, m)| m.visible_at)
                .map(|(idx, _)| idx)?;

            if max_receive_count.is_some_and(|max| self.messages[idx].receive_count >= max) {
                let redriven = self.messages.remove(idx);
                warn!(
                    message_id = %redriven.id,
                    receive_count = redriven.receive_count,
                    "message moved to dead-letter list"
                );
                self.dead_letters.push(QueueMessage {
                    message_id: redriven.id,
                    body: redriven.body,
                    receipt: redriven.receipt.unwrap_or_else(|| ReceiptHandle(String::new())),
                });
                continue;
            }

            let message = &mut self.messages[idx];
            let receipt = ReceiptHandle(Uuid::new_v4().to_string());
            message.receive_count += 1;
            message.visible_at = now + visibility_timeout;
            message.receipt = Some(receipt.clone());
            self.receives += 1;

            return Some(QueueMessage {
                message_id: message.id.clone(),
                body: message.body.clone(),
                receipt,
            });
        }
    }

    fn next_visible_at(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|m| m.visible_at).min()
    }
}

/// Clock-driven delay queue for local runs and tests.
pub struct InMemoryQueue {
    clock: Arc<dyn Clock>,
    simulated: Option<MockClock>,
    state: Mutex<QueueState>,
    notify: Notify,
    visibility_timeout: Duration,
    max_receive_count: Option<u32>,
    max_delay: Duration,
}

impl InMemoryQueue {
    /// Queue on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), None)
    }

    /// Queue on simulated time; receives advance `clock` instead of sleeping.
    pub fn simulated(clock: MockClock) -> Self {
        Self::with_clock(Arc::new(clock.clone()), Some(clock))
    }

    fn with_clock(clock: Arc<dyn Clock>, simulated: Option<MockClock>) -> Self {
        Self {
            clock,
            simulated,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            max_receive_count: None,
            max_delay: Duration::from_secs(MAX_QUEUE_DELAY_SECS),
        }
    }

    /// How long a received message stays hidden before redelivery.
    #[must_use]
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Redrive a message to the dead-letter list instead of delivering it
    /// once it has been received this many times.
    #[must_use]
    pub fn with_max_receive_count(mut self, count: u32) -> Self {
        self.max_receive_count = Some(count);
        self
    }

    /// Longest delay a single send accepts.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Messages currently held, in flight or waiting.
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sends(&self) -> u64 {
        self.state.lock().sends
    }

    /// Deliveries handed out; empty long-polls are not counted.
    pub fn receives(&self) -> u64 {
        self.state.lock().receives
    }

    pub fn deletes(&self) -> u64 {
        self.state.lock().deletes
    }

    pub fn dead_letters(&self) -> Vec<QueueMessage> {
        self.state.lock().dead_letters.clone()
    }

    /// Bodies of every message still held, earliest visible first.
    pub fn bodies(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut messages: Vec<_> = state.messages.iter().collect();
        messages.sort_by_key(|m| m.visible_at);
        messages.into_iter().map(|m| m.body.clone()).collect()
    }

    fn to_chrono(duration: Duration) -> Result<chrono::Duration> {
        chrono::Duration::from_std(duration)
            .map_err(|_| DelayqError::Queue(format!("duration {duration:?} out of range")))
    }

    fn take_visible(&self, now: DateTime<Utc>) -> Result<Option<QueueMessage>> {
        let visibility_timeout = Self::to_chrono(self.visibility_timeout)?;
        Ok(self.state.lock().take_visible(now, visibility_timeout, self.max_receive_count))
    }

    async fn receive_simulated(
        &self,
        clock: &MockClock,
        wait: Duration,
    ) -> Result<Option<QueueMessage>> {
        let deadline = clock.now() + Self::to_chrono(wait)?;
        loop {
            let now = clock.now();
            if let Some(message) = self.take_visible(now)? {
                return Ok(Some(message));
            }

            let next = self.state.lock().next_visible_at();
            match next {
                Some(visible_at) if visible_at <= deadline => clock.set(visible_at.max(now)),
                _ => {
                    clock.set(deadline.max(now));
                    // Let other tasks observe the idle wait.
                    tokio::task::yield_now().await;
                    return Ok(None);
                }
            }
        }
    }

    async fn receive_real(&self, wait: Duration) -> Result<Option<QueueMessage>> {
        let deadline = self.clock.now() + Self::to_chrono(wait)?;
        loop {
            let now = self.clock.now();
            if let Some(message) = self.take_visible(now)? {
                return Ok(Some(message));
            }

            let Some(left) = (deadline - now).to_std().ok().filter(|left| !left.is_zero()) else {
                return Ok(None);
            };
            let next = self.state.lock().next_visible_at();
            let pause = next
                .and_then(|visible_at| (visible_at - now).to_std().ok())
                .map_or(left, |until_visible| until_visible.min(left));

            tokio::select! {
                () = self.notify.notified() => {}
                () = tokio::time::sleep(pause) => {}
            }
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueGateway for InMemoryQueue {
    async fn send(&self, body: &str, delay: Duration) -> Result<MessageId> {
        if delay > self.max_delay {
            return Err(DelayqError::Queue(format!(
                "delay of {}s exceeds the queue maximum of {}s",
                delay.as_secs(),
                self.max_delay.as_secs()
            )));
        }

        let id = MessageId(Uuid::new_v4().to_string());
        let visible_at = self.clock.now() + Self::to_chrono(delay)?;
        {
            let mut state = self.state.lock();
            state.messages.push(StoredMessage {
                id: id.clone(),
                body: body.to_string(),
                visible_at,
                receive_count: 0,
                receipt: None,
            });
            state.sends += 1;
        }
        self.notify.notify_one();

        debug!(message_id = %id, delay_secs = delay.as_secs(), "message enqueued");
        Ok(id)
    }

    async fn receive(&self, wait: Duration) -> Result<Option<QueueMessage>> {
        match &self.simulated {
            Some(clock) => self.receive_simulated(clock, wait).await,
            None => self.receive_real(wait).await,
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<()> {
        let mut state = self.state.lock();
        let idx = state
            .messages
            .iter()
            .position(|m| m.receipt.as_ref() == Some(receipt))
            .ok_or_else(|| DelayqError::Queue(format!("unknown receipt handle: {receipt}")))?;
        state.messages.remove(idx);
        state.deletes += 1;
        Ok(())
    }

    fn max_delay(&self) -> Duration {
        self.max_delay
    }
}
