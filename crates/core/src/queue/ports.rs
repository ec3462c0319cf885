//! Port interface for the durable delay queue

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use delayq_domain::constants::MAX_QUEUE_DELAY_SECS;
use delayq_domain::Result;

/// Identifier assigned by the queue to an enqueued message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// Opaque token that acknowledges one particular delivery of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message handed out by [`QueueGateway::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: MessageId,
    pub body: String,
    pub receipt: ReceiptHandle,
}

/// Durable, delay-capable, at-least-once message transport.
///
/// Implementations must be safe to call concurrently: `send` is invoked both
/// from the poll loop and from arbitrary job submitters.
#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Enqueue `body`, invisible to receivers until `delay` has elapsed.
    ///
    /// Callers clamp `delay` to [`QueueGateway::max_delay`] beforehand.
    async fn send(&self, body: &str, delay: Duration) -> Result<MessageId>;

    /// Long-poll for at most one message, waiting up to `wait`.
    async fn receive(&self, wait: Duration) -> Result<Option<QueueMessage>>;

    /// Acknowledge a delivery so the message is not redelivered.
    async fn delete(&self, receipt: &ReceiptHandle) -> Result<()>;

    /// Longest delay a single `send` accepts.
    fn max_delay(&self) -> Duration {
        Duration::from_secs(MAX_QUEUE_DELAY_SECS)
    }
}
