//! Network probing seams
//!
//! Two narrow async traits separate the monitor loop from the wire:
//! [`Prober`] answers "is it up" (ICMP in production), [`CounterSource`]
//! fetches the octet counters backing throughput estimation (SNMP in
//! production). Tests substitute scripted implementations.

pub mod ping;
pub mod snmp;

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::HealthState;

pub use ping::IcmpProber;
pub use snmp::SnmpCounterSource;

/// Outcome of one reachability probe.
///
/// Unreachable is a report, not an error: `status` carries
/// Offline/Timeout/Error and the loss is 100%.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub status: HealthState,

    /// Average round-trip time of successful replies, in milliseconds.
    pub response_time: Option<f64>,

    /// (attempts - replies) / attempts * 100
    pub packet_loss: f64,
}

impl ProbeReport {
    /// Report for a probe where nothing came back within the deadline.
    pub fn timed_out() -> Self {
        Self {
            status: HealthState::Timeout,
            response_time: None,
            packet_loss: 100.0,
        }
    }
}

/// Best-effort interface identity, fetched once per device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: Option<String>,
    pub speed_bps: Option<u64>,
}

/// Octet counters read in one collection pass.
///
/// Each counter is independent: a device answering only one query yields a
/// reading with the other counter absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterReading {
    pub in_octets: Option<u64>,
    pub out_octets: Option<u64>,
    pub interface: Option<InterfaceInfo>,
}

impl CounterReading {
    /// Both counters present, usable as a rate sample.
    pub fn is_complete(&self) -> bool {
        self.in_octets.is_some() && self.out_octets.is_some()
    }
}

/// Liveness probing for a single address.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Send `attempts` probes, each bounded by `timeout`.
    ///
    /// Must only fail for malformed input or a broken probe mechanism;
    /// an unreachable host is an ordinary [`ProbeReport`].
    async fn probe(
        &self,
        address: IpAddr,
        timeout: Duration,
        attempts: usize,
    ) -> anyhow::Result<ProbeReport>;
}

/// Octet-counter collection for a single address.
#[async_trait]
pub trait CounterSource: Send + Sync {
    /// Query both counters; failures surface as absent fields, never errors.
    async fn collect(&self, address: IpAddr) -> CounterReading;
}
