//! ICMP reachability prober
//!
//! Sends a burst of echo requests per poll and averages the round trips.
//! Opening the ICMP sockets requires elevated privileges on most systems;
//! that failure is surfaced once from [`IcmpProber::new`] instead of being
//! retried per device per cycle.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence, SurgeError};
use tracing::trace;

use super::{ProbeReport, Prober};
use crate::HealthState;

const PAYLOAD: [u8; 56] = [0; 56];

/// Prober backed by ICMP echo requests.
pub struct IcmpProber {
    client_v4: Client,
    client_v6: Client,
}

impl IcmpProber {
    /// Open the ICMP sockets.
    ///
    /// Fails when the process may not create them (missing CAP_NET_RAW or
    /// equivalent); callers should abort startup rather than poll with a
    /// prober that can never succeed.
    pub fn new() -> anyhow::Result<Self> {
        let client_v4 = Client::new(&Config::default())
            .context("failed to open ICMPv4 socket (insufficient privileges?)")?;
        let client_v6 = Client::new(&Config::builder().kind(ICMP::V6).build())
            .context("failed to open ICMPv6 socket (insufficient privileges?)")?;

        Ok(Self {
            client_v4,
            client_v6,
        })
    }

    fn client_for(&self, address: IpAddr) -> &Client {
        match address {
            IpAddr::V4(_) => &self.client_v4,
            IpAddr::V6(_) => &self.client_v6,
        }
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(
        &self,
        address: IpAddr,
        timeout: Duration,
        attempts: usize,
    ) -> anyhow::Result<ProbeReport> {
        anyhow::ensure!(attempts > 0, "probe attempts must be at least 1");

        let ident = PingIdentifier(std::process::id() as u16);
        let mut pinger = self.client_for(address).pinger(address, ident).await;
        pinger.timeout(timeout);

        let mut round_trips = Vec::with_capacity(attempts);
        let mut timeouts = 0usize;

        for seq in 0..attempts {
            match pinger.ping(PingSequence(seq as u16), &PAYLOAD).await {
                Ok((_packet, rtt)) => {
                    trace!("{address}: reply seq={seq} in {rtt:?}");
                    round_trips.push(rtt);
                }
                Err(SurgeError::Timeout { .. }) => {
                    trace!("{address}: seq={seq} timed out");
                    timeouts += 1;
                }
                Err(e) => {
                    trace!("{address}: seq={seq} failed: {e}");
                }
            }
        }

        let replies = round_trips.len();
        let packet_loss = (attempts - replies) as f64 / attempts as f64 * 100.0;

        let report = if replies > 0 {
            let avg_ms = round_trips
                .iter()
                .map(|rtt| rtt.as_secs_f64() * 1000.0)
                .sum::<f64>()
                / replies as f64;
            ProbeReport {
                status: HealthState::Online,
                response_time: Some(avg_ms),
                packet_loss,
            }
        } else if timeouts == attempts {
            ProbeReport::timed_out()
        } else {
            ProbeReport {
                status: HealthState::Offline,
                response_time: None,
                packet_loss,
            }
        };

        Ok(report)
    }
}
