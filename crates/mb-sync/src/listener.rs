//! Subscription listener: owns the receive loop against the event
//! transport. Each message is decoded, routed, and terminally acked or
//! nacked; the broker's retry policy handles everything past that point.

use std::sync::Arc;
use std::time::Duration;

use mb_common::EventEnvelope;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::consumer::{QueueConsumer, RawMessage};
use crate::error::Result;
use crate::router::EventRouter;

pub struct SubscriptionListener {
    consumer: Arc<dyn QueueConsumer>,
    router: Arc<EventRouter>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SubscriptionListener {
    pub fn new(consumer: Arc<dyn QueueConsumer>, router: Arc<EventRouter>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            consumer,
            router,
            shutdown_tx,
        }
    }

    /// Handle for signalling the listener to stop polling.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Blocking receive loop. Messages within one poll batch are handled
    /// concurrently; the handlers are stateless and idempotent, so two
    /// events for the same entity may safely be in flight at once.
    pub async fn listen(self: Arc<Self>) -> Result<()> {
        info!(subscription = %self.consumer.identifier(), "Begin receiving messages");
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(subscription = %self.consumer.identifier(), "Listener shutting down");
                    return Ok(());
                }
                polled = self.consumer.poll(10) => {
                    match polled {
                        Ok(messages) if !messages.is_empty() => {
                            for raw in messages {
                                let listener = self.clone();
                                tokio::spawn(async move {
                                    listener.handle(raw).await;
                                });
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Error polling subscription");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    /// Process one raw message through decode and routing to a terminal
    /// ack/nack. Never returns an error: the disposition is the outcome.
    pub async fn handle(&self, raw: RawMessage) {
        let event: EventEnvelope = match serde_json::from_str(&raw.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    broker_message_id = ?raw.broker_message_id,
                    error = %e,
                    "Could not decode message body, nacking"
                );
                self.nack(&raw.receipt_handle).await;
                return;
            }
        };

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Received event"
        );

        match self.router.route(&event).await {
            Ok(()) => {
                if let Err(e) = self.consumer.ack(&raw.receipt_handle).await {
                    error!(event_id = %event.event_id, error = %e, "Ack failed");
                    return;
                }
                info!(event_id = %event.event_id, "Message acked");
            }
            Err(e) => {
                error!(event_id = %event.event_id, error = %e, "Event handling failed");
                self.nack(&raw.receipt_handle).await;
                info!(event_id = %event.event_id, "Message nacked");
            }
        }
    }

    async fn nack(&self, receipt_handle: &str) {
        if let Err(e) = self.consumer.nack(receipt_handle, None).await {
            error!(error = %e, "Nack failed");
        }
    }
}
