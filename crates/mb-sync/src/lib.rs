//! The synchronization core: receives marketplace lifecycle events from a
//! queue, mirrors procurement state into the subscription store, and sends
//! approval calls back to the procurement API.
//!
//! The core holds no durable state of its own. Every handler is an
//! idempotent read-remote/write-remote upsert, so at-least-once and
//! reordered delivery converge to the same mirrored state.

pub mod approval;
pub mod consumer;
pub mod error;
pub mod listener;
pub mod reconcile;
pub mod router;

#[cfg(test)]
pub(crate) mod fakes;

pub use approval::{ApprovalWorkflow, CreationOutcome};
pub use consumer::{QueueConsumer, RawMessage, SqsQueueConsumer};
pub use error::{Result, SyncError};
pub use listener::SubscriptionListener;
pub use reconcile::{AccountReconciler, EntitlementReconciler};
pub use router::EventRouter;
