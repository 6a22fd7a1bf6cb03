//! HTTP client for the internal subscription store (the mirror).
//!
//! Writes are upserts: redelivered events re-write the same record
//! instead of failing on "already exists".

use std::time::Duration;

use async_trait::async_trait;
use mb_common::{Account, Entitlement, STATE_CREATION_REQUESTED};
use tracing::debug;

use crate::commerce::check;
use crate::error::GatewayError;
use crate::{AccountSink, EntitlementSink};

#[derive(Debug, Clone)]
pub struct SubscriptionStoreConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SubscriptionStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8085".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct SubscriptionStoreGateway {
    client: reqwest::Client,
    base_url: String,
}

impl SubscriptionStoreGateway {
    pub fn new(config: SubscriptionStoreConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EntitlementSink for SubscriptionStoreGateway {
    async fn upsert_entitlement(&self, entitlement: &Entitlement) -> Result<(), GatewayError> {
        let url = format!("{}/entitlements", self.base_url);
        debug!(entitlement_id = %entitlement.id, "Upserting entitlement mirror");
        let response = self.client.put(&url).json(entitlement).send().await?;
        check("upsert entitlement", response).await?;
        Ok(())
    }

    async fn delete_entitlement(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/entitlements/{}", self.base_url, id);
        debug!(entitlement_id = %id, "Deleting entitlement mirror");
        let response = self.client.delete(&url).send().await?;
        check("delete entitlement", response).await?;
        Ok(())
    }

    async fn unapproved_entitlements(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entitlement>, GatewayError> {
        let url = format!("{}/accounts/{}/entitlements", self.base_url, account_id);
        debug!(account_id = %account_id, "Querying unapproved entitlements");
        let response = self
            .client
            .get(&url)
            .query(&[("filter", format!("state={}", STATE_CREATION_REQUESTED))])
            .send()
            .await?;
        let response = check("unapproved entitlements", response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AccountSink for SubscriptionStoreGateway {
    async fn upsert_account(&self, account: &Account) -> Result<(), GatewayError> {
        let url = format!("{}/accounts", self.base_url);
        debug!(account_id = %account.id, "Upserting account mirror");
        let response = self.client.put(&url).json(account).send().await?;
        check("upsert account", response).await?;
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/accounts/{}", self.base_url, id);
        debug!(account_id = %id, "Deleting account mirror");
        let response = self.client.delete(&url).send().await?;
        check("delete account", response).await?;
        Ok(())
    }

    /// Existence probe: 200 means the account is mirrored, any other
    /// status means it is not. Transport failures still surface as errors
    /// so a flapping store does not look like a missing account.
    async fn account_exists(&self, id: &str) -> Result<bool, GatewayError> {
        let url = format!("{}/accounts/{}", self.base_url, id);
        debug!(account_id = %id, "Probing account existence");
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}
