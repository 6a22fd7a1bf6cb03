//! HTTP client for the marketplace procurement API.
//!
//! All entitlement/account reads and approval calls are scoped under the
//! configured partner: `{base_url}/providers/{partner_id}/...`.

use std::time::Duration;

use async_trait::async_trait;
use mb_common::{Account, Entitlement};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::{AccountSource, EntitlementApprover, EntitlementSource};

#[derive(Debug, Clone)]
pub struct CommerceGatewayConfig {
    /// Procurement API base URL, without the provider path.
    pub base_url: String,
    pub partner_id: String,
    /// Optional Bearer token for authentication.
    pub api_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for CommerceGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cloudcommerceprocurement.googleapis.com".to_string(),
            partner_id: "000".to_string(),
            api_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Plan-change approval payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanChangeApproval<'a> {
    pending_plan_name: &'a str,
}

/// Account approval payload; the marketplace signup flow uses a fixed
/// approval name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountApproval<'a> {
    approval_name: &'a str,
}

pub struct CommerceGateway {
    client: reqwest::Client,
    api_token: Option<String>,
    /// `{base_url}/providers/{partner_id}`
    provider_base: String,
}

impl CommerceGateway {
    pub fn new(config: CommerceGatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        let provider_base = format!(
            "{}/providers/{}",
            config.base_url.trim_end_matches('/'),
            config.partner_id
        );

        Ok(Self {
            client,
            api_token: config.api_token,
            provider_base,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(url))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Approve a marketplace account signup. Not invoked by the event
    /// router; exposed for the signup front-end.
    pub async fn approve_account(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/accounts/{}:approve", self.provider_base, id);
        info!(account_id = %id, "Sending account approval");
        let response = self
            .post(&url)
            .json(&AccountApproval { approval_name: "signup" })
            .send()
            .await?;
        check("account approval", response).await?;
        Ok(())
    }

    /// Reset a marketplace account back to its pre-signup state.
    pub async fn reset_account(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/accounts/{}:reset", self.provider_base, id);
        info!(account_id = %id, "Sending account reset");
        let response = self.post(&url).send().await?;
        check("account reset", response).await?;
        Ok(())
    }
}

#[async_trait]
impl EntitlementSource for CommerceGateway {
    async fn get_entitlement(&self, id: &str) -> Result<Entitlement, GatewayError> {
        let url = format!("{}/entitlements/{}", self.provider_base, id);
        debug!(entitlement_id = %id, url = %url, "Fetching entitlement");
        let response = self.get(&url).send().await?;
        let response = check("get entitlement", response).await?;

        // The payload does not carry its own id; stamp the requested one.
        let mut entitlement: Entitlement = response.json().await?;
        entitlement.id = id.to_string();
        Ok(entitlement)
    }
}

#[async_trait]
impl AccountSource for CommerceGateway {
    async fn get_account(&self, id: &str) -> Result<Account, GatewayError> {
        let url = format!("{}/accounts/{}", self.provider_base, id);
        debug!(account_id = %id, url = %url, "Fetching account");
        let response = self.get(&url).send().await?;
        let response = check("get account", response).await?;

        let mut account: Account = response.json().await?;
        account.id = id.to_string();
        Ok(account)
    }
}

#[async_trait]
impl EntitlementApprover for CommerceGateway {
    async fn approve_entitlement(&self, id: &str) -> Result<(), GatewayError> {
        let url = format!("{}/entitlements/{}:approve", self.provider_base, id);
        info!(entitlement_id = %id, "Sending entitlement approval");
        let response = self.post(&url).send().await?;
        check("entitlement approval", response).await?;
        Ok(())
    }

    async fn approve_plan_change(&self, id: &str, pending_plan: &str) -> Result<(), GatewayError> {
        let url = format!("{}/entitlements/{}:approvePlanChange", self.provider_base, id);
        info!(entitlement_id = %id, pending_plan = %pending_plan, "Sending plan change approval");
        let response = self
            .post(&url)
            .json(&PlanChangeApproval { pending_plan_name: pending_plan })
            .send()
            .await?;
        check("plan change approval", response).await?;
        Ok(())
    }
}

/// Treat any non-2xx as failure, capturing the raw body for diagnostics.
pub(crate) async fn check(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        endpoint,
        status: status.as_u16(),
        body,
    })
}
