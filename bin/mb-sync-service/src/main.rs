//! MarketBridge Sync Service
//!
//! Listens to marketplace lifecycle events on an SQS subscription, mirrors
//! procurement accounts and entitlements into the subscription store, and
//! sends approval calls back to the procurement API.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MB_CONFIG_FILE` | - | Optional JSON config file; env vars override it |
//! | `MB_SUBSCRIPTION` | - | Event subscription (SQS queue name, required) |
//! | `MB_PARTNER_ID` | - | Marketplace partner/provider id (required) |
//! | `MB_COMMERCE_URL` | - | Procurement API base URL (required) |
//! | `MB_COMMERCE_API_TOKEN` | - | Optional Bearer token for the procurement API |
//! | `MB_SUBSCRIPTION_SERVICE_URL` | - | Subscription store base URL (required) |
//! | `MB_HEALTH_PORT` | `8095` | Health endpoint port |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mb_gateway::{
    CommerceGateway, CommerceGatewayConfig, SubscriptionStoreConfig, SubscriptionStoreGateway,
};
use mb_sync::{
    AccountReconciler, ApprovalWorkflow, EntitlementReconciler, EventRouter, SqsQueueConsumer,
    SubscriptionListener,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceConfig {
    subscription: String,
    partner_id: String,
    commerce_url: String,
    commerce_api_token: Option<String>,
    subscription_service_url: String,
    health_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            subscription: String::new(),
            partner_id: String::new(),
            commerce_url: "https://cloudcommerceprocurement.googleapis.com".to_string(),
            commerce_api_token: None,
            subscription_service_url: String::new(),
            health_port: 8095,
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the optional JSON config file, then env overrides.
    fn load() -> Result<Self> {
        let mut config = match std::env::var("MB_CONFIG_FILE") {
            Ok(path) if !path.is_empty() => {
                let file = std::fs::File::open(&path)
                    .with_context(|| format!("could not open config file {}", path))?;
                info!(path = %path, "Using config file");
                serde_json::from_reader(file)
                    .with_context(|| format!("could not parse config file {}", path))?
            }
            _ => ServiceConfig::default(),
        };

        if let Ok(v) = std::env::var("MB_SUBSCRIPTION") {
            config.subscription = v;
        }
        if let Ok(v) = std::env::var("MB_PARTNER_ID") {
            config.partner_id = v;
        }
        if let Ok(v) = std::env::var("MB_COMMERCE_URL") {
            config.commerce_url = v;
        }
        if let Ok(v) = std::env::var("MB_COMMERCE_API_TOKEN") {
            config.commerce_api_token = Some(v);
        }
        if let Ok(v) = std::env::var("MB_SUBSCRIPTION_SERVICE_URL") {
            config.subscription_service_url = v;
        }
        if let Ok(v) = std::env::var("MB_HEALTH_PORT") {
            config.health_port = v.parse().context("MB_HEALTH_PORT must be a port number")?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.subscription.is_empty() {
            missing.push("subscription (MB_SUBSCRIPTION)");
        }
        if self.partner_id.is_empty() {
            missing.push("partnerId (MB_PARTNER_ID)");
        }
        if self.commerce_url.is_empty() {
            missing.push("commerceUrl (MB_COMMERCE_URL)");
        }
        if self.subscription_service_url.is_empty() {
            missing.push("subscriptionServiceUrl (MB_SUBSCRIPTION_SERVICE_URL)");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("missing configuration: {}", missing.join(", "))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting MarketBridge Sync Service");

    let config = ServiceConfig::load()?;

    let commerce = Arc::new(CommerceGateway::new(CommerceGatewayConfig {
        base_url: config.commerce_url.clone(),
        partner_id: config.partner_id.clone(),
        api_token: config.commerce_api_token.clone(),
        ..Default::default()
    })?);

    let store = Arc::new(SubscriptionStoreGateway::new(SubscriptionStoreConfig {
        base_url: config.subscription_service_url.clone(),
        ..Default::default()
    })?);

    // Transport setup failure is fatal; there is no degraded mode.
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let sqs_client = aws_sdk_sqs::Client::new(&aws_config);
    let consumer = SqsQueueConsumer::connect(sqs_client, &config.subscription)
        .await
        .context("event subscription setup failed")?;
    info!(subscription = %config.subscription, "Event subscription resolved");

    let router = EventRouter::new(
        EntitlementReconciler::new(commerce.clone(), store.clone()),
        AccountReconciler::new(commerce.clone(), store.clone()),
        ApprovalWorkflow::new(commerce.clone(), commerce.clone(), store.clone()),
        store.clone(),
        store,
    );

    let listener = Arc::new(SubscriptionListener::new(
        Arc::new(consumer),
        Arc::new(router),
    ));
    let shutdown = listener.shutdown_handle();

    let listener_handle = tokio::spawn({
        let listener = listener.clone();
        async move {
            if let Err(e) = listener.listen().await {
                error!(error = %e, "Listener stopped with error");
            }
        }
    });

    // Health endpoint, probing both downstream systems.
    let health_state = Arc::new(HealthState::new(&config)?);
    let health_addr = SocketAddr::from(([0, 0, 0, 0], config.health_port));
    let health_app = axum::Router::new()
        .route("/healthz", axum::routing::get(healthz_handler))
        .route("/ready", axum::routing::get(ready_handler))
        .with_state(health_state);

    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    info!("Health endpoint listening on http://{}/healthz", health_addr);

    let health_handle = {
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            axum::serve(health_listener, health_app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        })
    };

    info!("MarketBridge Sync Service started");
    shutdown_signal().await;
    info!("Shutdown signal received...");

    let _ = shutdown.send(());
    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        let _ = listener_handle.await;
        let _ = health_handle.await;
    })
    .await;

    info!("MarketBridge Sync Service shutdown complete");
    Ok(())
}

struct HealthState {
    client: reqwest::Client,
    store_health_url: String,
    commerce_accounts_url: String,
    commerce_api_token: Option<String>,
}

impl HealthState {
    fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            store_health_url: format!(
                "{}/healthz",
                config.subscription_service_url.trim_end_matches('/')
            ),
            commerce_accounts_url: format!(
                "{}/providers/{}/accounts/",
                config.commerce_url.trim_end_matches('/'),
                config.partner_id
            ),
            commerce_api_token: config.commerce_api_token.clone(),
        })
    }
}

/// 200 only when both the subscription store and the procurement API answer.
async fn healthz_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    match state.client.get(&state.store_health_url).send().await {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => {
            warn!(status = %response.status(), "Healthz failed: subscription store unhealthy");
            return StatusCode::BAD_GATEWAY;
        }
        Err(e) => {
            warn!(error = %e, "Healthz failed: subscription store unreachable");
            return StatusCode::BAD_GATEWAY;
        }
    }

    let mut request = state.client.get(&state.commerce_accounts_url);
    if let Some(token) = &state.commerce_api_token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }
    match request.send().await {
        Ok(response) if response.status().is_success() => StatusCode::OK,
        Ok(response) => {
            warn!(status = %response.status(), "Healthz failed: procurement API unhealthy");
            StatusCode::BAD_GATEWAY
        }
        Err(e) => {
            warn!(error = %e, "Healthz failed: procurement API unreachable");
            StatusCode::BAD_GATEWAY
        }
    }
}

async fn ready_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "READY",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
