//! Approval workflow: decides whether an entitlement may be approved now
//! and performs the call back into the procurement API.
//!
//! The one true ordering dependency in the system lives here: a creation
//! approval must not be attempted until the owning account is mirrored
//! downstream. Creation events and account-activation events can arrive in
//! either order; a missing account defers the approval, which is retried
//! when ACCOUNT_ACTIVE fires for that account.

use std::sync::Arc;

use mb_common::Entitlement;
use mb_gateway::{AccountSink, EntitlementApprover, EntitlementSource};
use tracing::{info, warn};

use crate::error::Result;

/// Outcome of a creation-approval attempt. Deferral is not an error; the
/// event is still acknowledged so the sync portion is not retried forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    Approved,
    Deferred,
}

pub struct ApprovalWorkflow {
    approver: Arc<dyn EntitlementApprover>,
    source: Arc<dyn EntitlementSource>,
    accounts: Arc<dyn AccountSink>,
}

impl ApprovalWorkflow {
    pub fn new(
        approver: Arc<dyn EntitlementApprover>,
        source: Arc<dyn EntitlementSource>,
        accounts: Arc<dyn AccountSink>,
    ) -> Self {
        Self { approver, source, accounts }
    }

    /// Approve a requested entitlement creation, gated on the owning
    /// account already existing in the subscription store.
    pub async fn approve_creation(&self, entitlement: &Entitlement) -> Result<CreationOutcome> {
        if !self.accounts.account_exists(&entitlement.account).await? {
            info!(
                entitlement_id = %entitlement.id,
                account_id = %entitlement.account,
                "Account not mirrored yet, deferring entitlement approval"
            );
            return Ok(CreationOutcome::Deferred);
        }

        self.approver.approve_entitlement(&entitlement.id).await?;
        Ok(CreationOutcome::Approved)
    }

    /// Unconditional approval, used by the ACCOUNT_ACTIVE catch-up path for
    /// entitlements whose approval was deferred.
    pub async fn approve_pending(&self, entitlement_id: &str) -> Result<()> {
        self.approver.approve_entitlement(entitlement_id).await?;
        Ok(())
    }

    /// Approve a plan change, carrying the entitlement's pending plan name.
    /// The pre-fetch is best effort: if the entitlement cannot be read, the
    /// approval is still attempted with an empty plan name.
    pub async fn approve_plan_change(&self, entitlement_id: &str) -> Result<()> {
        let pending_plan = match self.source.get_entitlement(entitlement_id).await {
            Ok(entitlement) => entitlement.new_pending_plan,
            Err(e) => {
                warn!(
                    entitlement_id = %entitlement_id,
                    error = %e,
                    "Could not fetch entitlement before plan change approval"
                );
                String::new()
            }
        };

        self.approver
            .approve_plan_change(entitlement_id, &pending_plan)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeCommerce, FakeStore};
    use mb_common::Account;

    fn entitlement(id: &str, account: &str) -> Entitlement {
        Entitlement {
            id: id.to_string(),
            account: account.to_string(),
            ..Default::default()
        }
    }

    fn workflow(commerce: &Arc<FakeCommerce>, store: &Arc<FakeStore>) -> ApprovalWorkflow {
        ApprovalWorkflow::new(commerce.clone(), commerce.clone(), store.clone())
    }

    #[tokio::test]
    async fn creation_is_deferred_when_account_missing() {
        let commerce = Arc::new(FakeCommerce::default());
        let store = Arc::new(FakeStore::default());

        let outcome = workflow(&commerce, &store)
            .approve_creation(&entitlement("ent-1", "acct-1"))
            .await
            .unwrap();

        assert_eq!(outcome, CreationOutcome::Deferred);
        assert!(commerce.approved().is_empty());
    }

    #[tokio::test]
    async fn creation_is_approved_exactly_once_when_account_exists() {
        let commerce = Arc::new(FakeCommerce::default());
        let store = Arc::new(FakeStore::default());
        store.put_account(Account {
            id: "acct-1".to_string(),
            ..Default::default()
        });

        workflow(&commerce, &store)
            .approve_creation(&entitlement("ent-1", "acct-1"))
            .await
            .unwrap();

        assert_eq!(commerce.approved(), vec!["ent-1".to_string()]);
    }

    #[tokio::test]
    async fn plan_change_carries_pending_plan() {
        let commerce = Arc::new(FakeCommerce::default());
        let store = Arc::new(FakeStore::default());
        commerce.put_entitlement(Entitlement {
            id: "ent-1".to_string(),
            new_pending_plan: "pro-annual".to_string(),
            ..Default::default()
        });

        workflow(&commerce, &store).approve_plan_change("ent-1").await.unwrap();

        assert_eq!(
            commerce.plan_changes(),
            vec![("ent-1".to_string(), "pro-annual".to_string())]
        );
    }

    #[tokio::test]
    async fn plan_change_is_attempted_even_when_fetch_fails() {
        let commerce = Arc::new(FakeCommerce::default());
        let store = Arc::new(FakeStore::default());

        // No entitlement seeded: the pre-fetch fails, approval proceeds
        // with an empty plan name.
        workflow(&commerce, &store).approve_plan_change("ent-gone").await.unwrap();

        assert_eq!(
            commerce.plan_changes(),
            vec![("ent-gone".to_string(), String::new())]
        );
    }
}
