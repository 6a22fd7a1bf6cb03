use serde::{Deserialize, Serialize};

// ============================================================================
// Event Envelope
// ============================================================================

/// Lifecycle notification delivered by the marketplace transport.
///
/// The envelope only carries identifiers; authoritative entity state is
/// always re-fetched from the procurement API. Unknown fields are ignored
/// and missing `entitlement`/`account` objects decode to empty identifiers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub entitlement: EntitlementRef,
    #[serde(default)]
    pub account: AccountRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub update_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub update_time: String,
}

/// Event type tags emitted by the marketplace.
///
/// Anything outside the known set parses to `Unknown`; unknown types are
/// acknowledged so they never block the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    AccountActive,
    AccountDeleted,
    EntitlementCreationRequested,
    EntitlementActive,
    EntitlementPlanChangeRequested,
    EntitlementPlanChanged,
    EntitlementPendingCancellation,
    EntitlementCancelled,
    EntitlementDeleted,
    Test,
    Unknown,
}

impl EventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ACCOUNT_ACTIVE" => EventType::AccountActive,
            "ACCOUNT_DELETED" => EventType::AccountDeleted,
            "ENTITLEMENT_CREATION_REQUESTED" => EventType::EntitlementCreationRequested,
            "ENTITLEMENT_ACTIVE" => EventType::EntitlementActive,
            "ENTITLEMENT_PLAN_CHANGE_REQUESTED" => EventType::EntitlementPlanChangeRequested,
            "ENTITLEMENT_PLAN_CHANGED" => EventType::EntitlementPlanChanged,
            "ENTITLEMENT_PENDING_CANCELLATION" => EventType::EntitlementPendingCancellation,
            "ENTITLEMENT_CANCELLED" => EventType::EntitlementCancelled,
            "ENTITLEMENT_DELETED" => EventType::EntitlementDeleted,
            "TEST" => EventType::Test,
            _ => EventType::Unknown,
        }
    }
}

// ============================================================================
// Mirrored Entities
// ============================================================================

/// Entitlement state used by the unapproved-entitlement catch-up query.
pub const STATE_CREATION_REQUESTED: &str = "ENTITLEMENT_CREATION_REQUESTED";

/// Subscription-like grant of a product/plan to an account.
///
/// The canonical copy lives in the procurement API; this struct is the
/// denormalized mirror written to the subscription store. Timestamps stay
/// as the wire strings the procurement API emits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Bare account identifier in the mirror; the procurement API may
    /// return a path-qualified reference (`providers/X/accounts/Y`).
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub new_pending_plan: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub usage_reporting_id: String,
    #[serde(default)]
    pub message_to_user: String,
}

/// Marketplace customer record mirrored into the subscription store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub update_time: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub state: String,
    /// Procurement-side approval history; forwarded verbatim, never
    /// mutated by the sync engine.
    #[serde(default)]
    pub approvals: Vec<Approval>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub update_time: String,
}
