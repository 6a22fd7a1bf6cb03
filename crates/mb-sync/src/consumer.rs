//! Queue consumer abstraction over the event transport.
//!
//! The transport guarantees at-least-once, possibly-reordered delivery.
//! Ack deletes the message; nack makes it immediately visible again so the
//! broker redelivers it per its retry policy.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, SyncError};

/// A message as pulled off the queue, before decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub body: String,
    pub receipt_handle: String,
    /// Broker-assigned id, for log correlation only.
    pub broker_message_id: Option<String>,
}

#[async_trait]
pub trait QueueConsumer: Send + Sync {
    fn identifier(&self) -> &str;

    /// Long-poll for up to `max_messages` messages.
    async fn poll(&self, max_messages: u32) -> Result<Vec<RawMessage>>;

    async fn ack(&self, receipt_handle: &str) -> Result<()>;

    async fn nack(&self, receipt_handle: &str, delay_seconds: Option<u32>) -> Result<()>;
}

/// SQS-backed consumer for the marketplace event subscription.
pub struct SqsQueueConsumer {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    identifier: String,
}

impl SqsQueueConsumer {
    /// Resolve the queue URL for the named subscription. A missing or
    /// unreachable queue is a transport setup error, fatal to the process.
    pub async fn connect(client: aws_sdk_sqs::Client, queue_name: &str) -> Result<Self> {
        let response = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| {
                SyncError::Queue(format!("subscription {} is not reachable: {}", queue_name, e))
            })?;

        let queue_url = response
            .queue_url()
            .ok_or_else(|| SyncError::Queue(format!("subscription {} has no queue url", queue_name)))?
            .to_string();

        Ok(Self {
            client,
            queue_url,
            identifier: queue_name.to_string(),
        })
    }
}

#[async_trait]
impl QueueConsumer for SqsQueueConsumer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn poll(&self, max_messages: u32) -> Result<Vec<RawMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.min(10) as i32)
            .wait_time_seconds(10)
            .send()
            .await
            .map_err(|e| SyncError::Queue(format!("receive failed: {}", e)))?;

        let mut messages = Vec::new();
        for message in response.messages() {
            let (Some(body), Some(receipt_handle)) = (message.body(), message.receipt_handle())
            else {
                debug!("Skipping message without body or receipt handle");
                continue;
            };
            messages.push(RawMessage {
                body: body.to_string(),
                receipt_handle: receipt_handle.to_string(),
                broker_message_id: message.message_id().map(str::to_string),
            });
        }
        Ok(messages)
    }

    async fn ack(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| SyncError::Queue(format!("ack failed: {}", e)))?;
        Ok(())
    }

    async fn nack(&self, receipt_handle: &str, delay_seconds: Option<u32>) -> Result<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(delay_seconds.unwrap_or(0) as i32)
            .send()
            .await
            .map_err(|e| SyncError::Queue(format!("nack failed: {}", e)))?;
        Ok(())
    }
}
