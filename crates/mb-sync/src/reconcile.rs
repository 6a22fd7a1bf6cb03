//! Reconcilers: re-fetch canonical state from the procurement API and
//! overwrite the mirror in the subscription store.
//!
//! The event payload's embedded fields are never trusted; every event
//! triggers an authoritative re-read, which is what makes redelivery and
//! reordering safe (last write wins).

use std::sync::Arc;

use mb_common::{Account, Entitlement};
use mb_gateway::{AccountSink, AccountSource, EntitlementSink, EntitlementSource};
use tracing::debug;

use crate::error::Result;

pub struct EntitlementReconciler {
    source: Arc<dyn EntitlementSource>,
    sink: Arc<dyn EntitlementSink>,
}

impl EntitlementReconciler {
    pub fn new(source: Arc<dyn EntitlementSource>, sink: Arc<dyn EntitlementSink>) -> Self {
        Self { source, sink }
    }

    /// Fetch the entitlement, normalize its owning-account reference to a
    /// bare identifier, and upsert the mirror. Returns the fetched value so
    /// callers can inspect fields without a second remote call.
    pub async fn sync(&self, entitlement_id: &str) -> Result<Entitlement> {
        let mut entitlement = self.source.get_entitlement(entitlement_id).await?;
        entitlement.account = account_basename(&entitlement.account).to_string();
        self.sink.upsert_entitlement(&entitlement).await?;
        debug!(entitlement_id = %entitlement_id, account_id = %entitlement.account, "Entitlement mirrored");
        Ok(entitlement)
    }
}

pub struct AccountReconciler {
    source: Arc<dyn AccountSource>,
    sink: Arc<dyn AccountSink>,
}

impl AccountReconciler {
    pub fn new(source: Arc<dyn AccountSource>, sink: Arc<dyn AccountSink>) -> Self {
        Self { source, sink }
    }

    pub async fn sync(&self, account_id: &str) -> Result<Account> {
        let account = self.source.get_account(account_id).await?;
        self.sink.upsert_account(&account).await?;
        debug!(account_id = %account_id, "Account mirrored");
        Ok(account)
    }
}

/// Trailing path segment of a possibly path-qualified resource name,
/// e.g. `providers/acme/accounts/acct-123` -> `acct-123`.
fn account_basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
