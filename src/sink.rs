//! Persistence sink interface
//!
//! Durable storage is an external collaborator: the core only pushes status
//! snapshots after each cycle and alert events as they fire. Running with
//! zero sinks is fully supported and the default.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::DeviceStatus;
use crate::alerts::AlertEvent;

/// Receiver of per-cycle status snapshots and alert events.
///
/// Implementations must not block the monitor loop longer than necessary;
/// failures are logged by the caller and never abort a cycle.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Called once per poll cycle with the post-cycle snapshot of all devices.
    async fn record_statuses(&self, statuses: &[DeviceStatus]) -> anyhow::Result<()>;

    /// Called for every published alert event.
    async fn record_alert(&self, event: &AlertEvent) -> anyhow::Result<()>;
}

/// In-memory sink, mainly for tests and single-process deployments.
#[derive(Default)]
pub struct MemorySink {
    statuses: Mutex<Vec<Vec<DeviceStatus>>>,
    alerts: Mutex<Vec<AlertEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots recorded so far, one entry per completed cycle.
    pub async fn recorded_statuses(&self) -> Vec<Vec<DeviceStatus>> {
        self.statuses.lock().await.clone()
    }

    pub async fn recorded_alerts(&self) -> Vec<AlertEvent> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl StatusSink for MemorySink {
    async fn record_statuses(&self, statuses: &[DeviceStatus]) -> anyhow::Result<()> {
        self.statuses.lock().await.push(statuses.to_vec());
        Ok(())
    }

    async fn record_alert(&self, event: &AlertEvent) -> anyhow::Result<()> {
        self.alerts.lock().await.push(event.clone());
        Ok(())
    }
}
