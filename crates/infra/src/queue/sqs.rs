//! Amazon SQS gateway
//!
//! Sends with `DelaySeconds`, long-polls one message at a time with
//! `WaitTimeSeconds`, and acknowledges by receipt handle. Credentials come
//! from the default AWS provider chain; region and endpoint from
//! [`QueueConfig`]. An endpoint override points the client at a local
//! emulator such as LocalStack or ElasticMQ.
//!
//! The dead-letter redrive policy is configured on the queue itself, outside
//! this crate.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::Client;
use delayq_core::{MessageId, QueueGateway, QueueMessage, ReceiptHandle};
use delayq_domain::constants::{MAX_QUEUE_DELAY_SECS, MAX_RECEIVE_WAIT_SECS};
use delayq_domain::{DelayqError, QueueConfig, Result};
use tracing::debug;

use crate::errors::InfraError;

/// [`QueueGateway`] backed by one SQS queue.
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Build a client from the default AWS config chain.
    pub async fn from_config(config: &QueueConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(endpoint_url) = &config.endpoint {
            debug!("Using custom SQS endpoint: {}", endpoint_url);
            builder = builder.endpoint_url(endpoint_url);
        }

        Self::new(Client::from_conf(builder.build()), config.url.clone())
    }

    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self { client, queue_url: queue_url.into() }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

/// Whole seconds for an SQS integer parameter, clamped to `max`.
fn clamp_secs(duration: Duration, max: u64) -> i32 {
    i32::try_from(duration.as_secs().min(max)).unwrap_or(i32::MAX)
}

#[async_trait]
impl QueueGateway for SqsQueue {
    async fn send(&self, body: &str, delay: Duration) -> Result<MessageId> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .delay_seconds(clamp_secs(delay, MAX_QUEUE_DELAY_SECS))
            .send()
            .await
            .map_err(InfraError::from)?;

        let message_id = output.message_id().unwrap_or_default().to_string();
        debug!(message_id = %message_id, delay_secs = delay.as_secs(), "SQS message sent");
        Ok(MessageId(message_id))
    }

    async fn receive(&self, wait: Duration) -> Result<Option<QueueMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(clamp_secs(wait, MAX_RECEIVE_WAIT_SECS))
            .send()
            .await
            .map_err(InfraError::from)?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };
        let receipt = message.receipt_handle().ok_or_else(|| {
            DelayqError::Queue("SQS message arrived without a receipt handle".to_string())
        })?;

        Ok(Some(QueueMessage {
            message_id: MessageId(message.message_id().unwrap_or_default().to_string()),
            body: message.body().unwrap_or_default().to_string(),
            receipt: ReceiptHandle(receipt.to_string()),
        }))
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&receipt.0)
            .send()
            .await
            .map_err(InfraError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_parameters_are_clamped() {
        assert_eq!(clamp_secs(Duration::from_millis(2_500), 900), 2);
        assert_eq!(clamp_secs(Duration::from_secs(5_000), 900), 900);
        assert_eq!(clamp_secs(Duration::from_secs(30), MAX_RECEIVE_WAIT_SECS), 20);
    }

    #[tokio::test]
    async fn builds_client_for_local_endpoint() {
        let config = QueueConfig {
            url: "http://localhost:4566/000000000000/jobs".to_string(),
            region: Some("us-east-1".to_string()),
            endpoint: Some("http://localhost:4566".to_string()),
            ..QueueConfig::default()
        };

        let queue = SqsQueue::from_config(&config).await;
        assert_eq!(queue.queue_url(), "http://localhost:4566/000000000000/jobs");
        assert_eq!(queue.max_delay(), Duration::from_secs(900));
    }
}
