//! Event-type dispatch. Pure routing, no I/O of its own: each known event
//! type maps to a fixed combination of reconciler, approval, and mirror
//! delete calls. Unknown and informational types are acknowledged so they
//! never block the queue.

use std::sync::Arc;

use mb_common::{EventEnvelope, EventType};
use mb_gateway::{AccountSink, EntitlementSink};
use tracing::{info, warn};

use crate::approval::{ApprovalWorkflow, CreationOutcome};
use crate::error::Result;
use crate::reconcile::{AccountReconciler, EntitlementReconciler};

pub struct EventRouter {
    entitlements: EntitlementReconciler,
    accounts: AccountReconciler,
    approvals: ApprovalWorkflow,
    entitlement_sink: Arc<dyn EntitlementSink>,
    account_sink: Arc<dyn AccountSink>,
}

impl EventRouter {
    pub fn new(
        entitlements: EntitlementReconciler,
        accounts: AccountReconciler,
        approvals: ApprovalWorkflow,
        entitlement_sink: Arc<dyn EntitlementSink>,
        account_sink: Arc<dyn AccountSink>,
    ) -> Self {
        Self {
            entitlements,
            accounts,
            approvals,
            entitlement_sink,
            account_sink,
        }
    }

    /// Handle one decoded event. `Ok` means the message should be acked,
    /// any error means nack and rely on transport redelivery.
    pub async fn route(&self, event: &EventEnvelope) -> Result<()> {
        match EventType::parse(&event.event_type) {
            EventType::AccountActive => self.on_account_active(&event.account.id).await,
            EventType::AccountDeleted => {
                self.account_sink.delete_account(&event.account.id).await?;
                Ok(())
            }
            EventType::EntitlementCreationRequested => {
                self.on_creation_requested(&event.entitlement.id).await
            }
            EventType::EntitlementActive
            | EventType::EntitlementPlanChanged
            | EventType::EntitlementCancelled => {
                self.entitlements.sync(&event.entitlement.id).await?;
                Ok(())
            }
            EventType::EntitlementPlanChangeRequested => {
                self.approvals.approve_plan_change(&event.entitlement.id).await?;
                self.entitlements.sync(&event.entitlement.id).await?;
                Ok(())
            }
            EventType::EntitlementPendingCancellation => {
                info!(event_id = %event.event_id, "ENTITLEMENT_PENDING_CANCELLATION ignored");
                Ok(())
            }
            EventType::EntitlementDeleted => {
                self.entitlement_sink.delete_entitlement(&event.entitlement.id).await?;
                Ok(())
            }
            EventType::Test => {
                info!(event_id = %event.event_id, "Test message received");
                Ok(())
            }
            EventType::Unknown => {
                warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "Unknown event type, acknowledging"
                );
                Ok(())
            }
        }
    }

    /// Mirror the account, then approve any entitlements whose creation
    /// approval was deferred while the account did not yet exist. An
    /// approval failure here propagates so the catch-up is retried on
    /// redelivery instead of being lost.
    async fn on_account_active(&self, account_id: &str) -> Result<()> {
        self.accounts.sync(account_id).await?;

        let pending = self.entitlement_sink.unapproved_entitlements(account_id).await?;
        if pending.is_empty() {
            info!(account_id = %account_id, "No unapproved entitlements for account");
            return Ok(());
        }

        for entitlement in pending {
            info!(
                account_id = %account_id,
                entitlement_id = %entitlement.id,
                "Approving entitlement deferred for this account"
            );
            self.approvals.approve_pending(&entitlement.id).await?;
        }
        Ok(())
    }

    async fn on_creation_requested(&self, entitlement_id: &str) -> Result<()> {
        let entitlement = self.entitlements.sync(entitlement_id).await?;
        match self.approvals.approve_creation(&entitlement).await? {
            CreationOutcome::Approved => {
                info!(entitlement_id = %entitlement_id, "Entitlement creation approved");
            }
            CreationOutcome::Deferred => {
                info!(
                    entitlement_id = %entitlement_id,
                    account_id = %entitlement.account,
                    "Entitlement approval deferred until account is active"
                );
            }
        }
        Ok(())
    }
}
