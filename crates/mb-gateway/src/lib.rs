//! Gateway clients for the two remote systems the sync engine talks to:
//! the marketplace procurement API (canonical state, approvals) and the
//! internal subscription store (mirrored state).
//!
//! The sync logic depends only on the capability traits below, so it can
//! be exercised with in-memory fakes instead of live HTTP.

pub mod commerce;
pub mod error;
pub mod store;

use async_trait::async_trait;
use mb_common::{Account, Entitlement};

pub use commerce::{CommerceGateway, CommerceGatewayConfig};
pub use error::GatewayError;
pub use store::{SubscriptionStoreGateway, SubscriptionStoreConfig};

/// Read access to canonical entitlement state.
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn get_entitlement(&self, id: &str) -> Result<Entitlement, GatewayError>;
}

/// Read access to canonical account state.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn get_account(&self, id: &str) -> Result<Account, GatewayError>;
}

/// Approval calls back into the procurement API.
#[async_trait]
pub trait EntitlementApprover: Send + Sync {
    async fn approve_entitlement(&self, id: &str) -> Result<(), GatewayError>;
    async fn approve_plan_change(&self, id: &str, pending_plan: &str) -> Result<(), GatewayError>;
}

/// Write access to the mirrored entitlement collection.
#[async_trait]
pub trait EntitlementSink: Send + Sync {
    async fn upsert_entitlement(&self, entitlement: &Entitlement) -> Result<(), GatewayError>;
    async fn delete_entitlement(&self, id: &str) -> Result<(), GatewayError>;
    /// Entitlements for an account still waiting in the creation-requested
    /// state, i.e. approvals deferred because the account did not exist yet.
    async fn unapproved_entitlements(&self, account_id: &str)
        -> Result<Vec<Entitlement>, GatewayError>;
}

/// Write access to the mirrored account collection.
#[async_trait]
pub trait AccountSink: Send + Sync {
    async fn upsert_account(&self, account: &Account) -> Result<(), GatewayError>;
    async fn delete_account(&self, id: &str) -> Result<(), GatewayError>;
    async fn account_exists(&self, id: &str) -> Result<bool, GatewayError>;
}
