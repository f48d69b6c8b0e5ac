//! Device registry - the single source of truth for monitored devices
//!
//! Holds, per device: the immutable identity, the current status snapshot,
//! the private counter baseline for rate computation, and the bounded status
//! history. All of it lives behind one short-held `RwLock`, so status queries
//! run concurrently with the monitor loop while each device's update is
//! serialized.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::alerts::AlertEvent;
use crate::history::HistoryRing;
use crate::probe::{CounterReading, ProbeReport};
use crate::rate::{self, COUNTER_WIDTH_64, CounterSnapshot};
use crate::{Device, DeviceStatus, DeviceTags, HealthState, HistorySample};

/// Typed errors for registry usage mistakes, distinct from network failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("device already registered: {name}")]
    DuplicateDevice { name: String },

    #[error("device not found: {name}")]
    DeviceNotFound { name: String },
}

struct DeviceEntry {
    device: Device,
    status: DeviceStatus,
    baseline: Option<CounterSnapshot>,
    history: HistoryRing,
}

/// Registry of monitored devices, safe for concurrent reads and updates.
pub struct DeviceRegistry {
    entries: RwLock<HashMap<String, DeviceEntry>>,
    history_capacity: usize,
}

impl DeviceRegistry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// Register a device with status `unknown` and an empty history.
    pub async fn add(&self, device: Device) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&device.name) {
            return Err(RegistryError::DuplicateDevice {
                name: device.name.clone(),
            });
        }

        debug!(
            "registered device {} ({}) for monitoring",
            device.name, device.ip_address
        );
        entries.insert(
            device.name.clone(),
            DeviceEntry {
                status: DeviceStatus::unknown(&device),
                baseline: None,
                history: HistoryRing::new(self.history_capacity),
                device,
            },
        );
        Ok(())
    }

    /// Remove a device together with its status and history.
    pub async fn remove(&self, name: &str) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        if entries.remove(name).is_none() {
            return Err(RegistryError::DeviceNotFound {
                name: name.to_string(),
            });
        }
        debug!("removed device {name} from monitoring");
        Ok(())
    }

    /// Replace a device's classification tags.
    pub async fn set_tags(&self, name: &str, tags: DeviceTags) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(name).ok_or_else(|| RegistryError::DeviceNotFound {
            name: name.to_string(),
        })?;
        entry.device.tags = tags.clone();
        entry.status.tags = tags;
        Ok(())
    }

    /// Snapshot of the devices to poll this cycle.
    pub async fn devices(&self) -> Vec<Device> {
        self.entries
            .read()
            .await
            .values()
            .map(|entry| entry.device.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Current status of one device.
    pub async fn status(&self, name: &str) -> Result<DeviceStatus, RegistryError> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|entry| entry.status.clone())
            .ok_or_else(|| RegistryError::DeviceNotFound {
                name: name.to_string(),
            })
    }

    /// Current status of every registered device.
    pub async fn list_status(&self) -> Vec<DeviceStatus> {
        self.entries
            .read()
            .await
            .values()
            .map(|entry| entry.status.clone())
            .collect()
    }

    /// The most recent `limit` history samples, chronological order.
    ///
    /// An unknown device yields an empty vec, not an error.
    pub async fn history(&self, name: &str, limit: usize) -> Vec<HistorySample> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|entry| entry.history.recent(limit))
            .unwrap_or_default()
    }

    /// Merge one poll result into a device's state.
    ///
    /// Performs the whole per-device update under a single lock acquisition:
    /// status overwrite, throughput derivation from the stored baseline,
    /// history append, and transition detection. Returns the alert to publish
    /// when the categorical state changed (first observations never alert).
    ///
    /// A device removed since the cycle's snapshot is skipped silently - the
    /// registry is the source of truth for what is monitored.
    pub async fn apply_check(
        &self,
        name: &str,
        report: ProbeReport,
        counters: Option<CounterReading>,
        now: DateTime<Utc>,
    ) -> Option<AlertEvent> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(name) else {
            trace!("poll result for unregistered device {name}, dropping");
            return None;
        };

        let previous = entry.status.status;
        let new_state = report.status;

        let throughput = if new_state.is_reachable() {
            match counters {
                Some(CounterReading {
                    in_octets: Some(in_octets),
                    out_octets: Some(out_octets),
                    interface,
                }) => {
                    let current = CounterSnapshot {
                        in_octets,
                        out_octets,
                        taken_at: now,
                    };

                    let throughput =
                        match rate::compute(entry.baseline.as_ref(), &current, COUNTER_WIDTH_64) {
                            Ok(rate) => rate.map(|t| t.total_mbps()),
                            Err(e) => {
                                debug!("{name}: discarding rate sample: {e}");
                                None
                            }
                        };

                    entry.baseline = Some(current);

                    if let Some(info) = interface {
                        if info.name.is_some() {
                            entry.status.interface_name = info.name;
                        }
                        if info.speed_bps.is_some() {
                            entry.status.interface_speed = info.speed_bps;
                        }
                    }

                    throughput
                }
                _ => {
                    // Missing or half a reading cannot seed the next delta.
                    entry.baseline = None;
                    None
                }
            }
        } else {
            // A gap makes the next delta meaningless.
            entry.baseline = None;
            Some(0.0)
        };

        entry.status.status = new_state;
        entry.status.response_time = report.response_time;
        entry.status.packet_loss = report.packet_loss;
        entry.status.throughput = throughput;
        entry.status.last_checked = Some(now);

        entry.history.append(HistorySample {
            timestamp: now,
            status: new_state,
            response_time: report.response_time,
            throughput,
            packet_loss: report.packet_loss,
        });

        if new_state != previous && previous != HealthState::Unknown {
            Some(AlertEvent {
                device_name: entry.device.name.clone(),
                ip_address: entry.device.ip_address,
                previous_status: previous,
                new_status: new_state,
                timestamp: now,
                tags: entry.device.tags.clone(),
            })
        } else {
            None
        }
    }
}
