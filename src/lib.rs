pub mod alerts;
pub mod api;
pub mod config;
pub mod history;
pub mod monitor;
pub mod probe;
pub mod rate;
pub mod registry;
pub mod sink;

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form classification labels attached to a device.
///
/// The deployment this was built for groups equipment by production line and
/// workshop, but the labels carry no semantics inside the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTags {
    pub line: Option<String>,
    pub workshop: Option<String>,
}

/// A monitored network endpoint.
///
/// Identity is the unique `name`; the address is fixed at registration,
/// the tags may be updated later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub ip_address: IpAddr,
    #[serde(flatten)]
    pub tags: DeviceTags,
}

/// Categorical health state of a device.
///
/// `Unknown` is the initial state before any poll has completed; it never
/// participates in transition alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Unknown,
    Online,
    Offline,
    Timeout,
    Error,
}

impl HealthState {
    /// Whether this state counts as reachable for counter collection.
    pub fn is_reachable(self) -> bool {
        matches!(self, HealthState::Online)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthState::Unknown => "unknown",
            HealthState::Online => "online",
            HealthState::Offline => "offline",
            HealthState::Timeout => "timeout",
            HealthState::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Current status snapshot of one device, overwritten each poll cycle.
///
/// This is the public view; the raw octet counters seeding the next rate
/// computation stay inside the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub name: String,
    pub ip_address: IpAddr,
    pub status: HealthState,

    /// Average round-trip time of the last probe, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,

    /// Packet loss of the last probe, 0-100.
    pub packet_loss: f64,

    /// Estimated throughput in Mbps, `data_rate` on the wire.
    #[serde(rename = "data_rate", skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,

    /// Interface description reported by the device, if it ever answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,

    /// Nominal interface speed in bit/s, if the device reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_speed: Option<u64>,

    /// Timestamp of the most recent poll attempt.
    pub last_checked: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub tags: DeviceTags,
}

impl DeviceStatus {
    /// Initial status for a freshly registered device.
    pub fn unknown(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            ip_address: device.ip_address,
            status: HealthState::Unknown,
            response_time: None,
            packet_loss: 0.0,
            throughput: None,
            interface_name: None,
            interface_speed: None,
            last_checked: None,
            tags: device.tags.clone(),
        }
    }
}

/// One immutable history entry, appended per poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(rename = "data_rate", skip_serializing_if = "Option::is_none")]
    pub throughput: Option<f64>,
    pub packet_loss: f64,
}
