//! Transition alerting
//!
//! The monitor loop hands every status transition to the [`AlertDispatcher`],
//! which invokes its subscribed sinks one after another in registration
//! order. A failing sink is logged and skipped; it can neither stop the
//! remaining sinks nor leak into the poll cycle.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::config::Webhook;
use crate::{DeviceTags, HealthState};

/// Emitted when a device's categorical state changes between two polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub device_name: String,
    pub ip_address: IpAddr,
    pub previous_status: HealthState,
    pub new_status: HealthState,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub tags: DeviceTags,
}

/// Consumer of alert events.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short identifier used in logs when delivery fails.
    fn name(&self) -> &str;

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// Fan-out of alert events to registered sinks.
#[derive(Default)]
pub struct AlertDispatcher {
    sinks: tokio::sync::RwLock<Vec<Arc<dyn AlertSink>>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. Sinks are notified in registration order.
    pub async fn subscribe(&self, sink: Arc<dyn AlertSink>) {
        self.sinks.write().await.push(sink);
    }

    pub async fn sink_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// Deliver an event to every sink, isolating failures per sink.
    #[instrument(skip(self, event), fields(device = %event.device_name))]
    pub async fn publish(&self, event: &AlertEvent) {
        let sinks = self.sinks.read().await.clone();
        for sink in sinks {
            if let Err(e) = sink.notify(event).await {
                error!("alert sink {} failed: {e:#}", sink.name());
            }
        }
    }
}

/// Sink that records transitions in the application log.
#[derive(Debug, Default)]
pub struct LogAlerter;

#[async_trait]
impl AlertSink for LogAlerter {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        info!(
            "ALERT: device {} ({}) changed from {} to {}",
            event.device_name, event.ip_address, event.previous_status, event.new_status
        );
        Ok(())
    }
}

/// Sink that POSTs each event as JSON to a configured webhook.
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    client: Client,
    webhook: Webhook,
}

impl WebhookAlerter {
    pub fn new(webhook: Webhook) -> Self {
        Self {
            client: Client::new(),
            webhook,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    fn name(&self) -> &str {
        "webhook"
    }

    #[instrument(skip(self, event), fields(device = %event.device_name))]
    async fn notify(&self, event: &AlertEvent) -> anyhow::Result<()> {
        let payload = json!({
            "message": format!(
                "Device `{}` changed from {} to {}",
                event.device_name, event.previous_status, event.new_status
            ),
            "event": event,
        });

        let response = self
            .client
            .post(&self.webhook.url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("delivered webhook alert");
            Ok(())
        } else {
            warn!("webhook alert failed with status: {}", response.status());
            anyhow::bail!("webhook returned status {}", response.status())
        }
    }
}
