//! SNMP octet-counter collector
//!
//! Polls ifHCInOctets / ifHCOutOctets (the 64-bit interface counters) over
//! SNMPv2c. The two counters are queried independently so a device answering
//! only one still yields a partial reading. Interface description and speed
//! change rarely and are fetched once per device, then cached.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use csnmp::{ObjectIdentifier, ObjectValue, Snmp2cClient};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::{CounterReading, CounterSource, InterfaceInfo};
use crate::config::SnmpConfig;

/// Counter source backed by SNMPv2c GET requests.
pub struct SnmpCounterSource {
    config: SnmpConfig,
    oid_in_octets: ObjectIdentifier,
    oid_out_octets: ObjectIdentifier,
    oid_interface_name: ObjectIdentifier,
    oid_interface_speed: ObjectIdentifier,
    interface_cache: RwLock<HashMap<IpAddr, InterfaceInfo>>,
}

impl SnmpCounterSource {
    pub fn new(config: SnmpConfig) -> Self {
        let index = config.interface_index;
        Self {
            oid_in_octets: oid(&format!("1.3.6.1.2.1.31.1.1.1.6.{index}")),
            oid_out_octets: oid(&format!("1.3.6.1.2.1.31.1.1.1.10.{index}")),
            oid_interface_name: oid(&format!("1.3.6.1.2.1.2.2.1.2.{index}")),
            oid_interface_speed: oid(&format!("1.3.6.1.2.1.2.2.1.5.{index}")),
            config,
            interface_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn connect(&self, address: IpAddr) -> Option<Snmp2cClient> {
        let target = SocketAddr::new(address, self.config.port);
        let bind: SocketAddr = match address {
            IpAddr::V4(_) => "0.0.0.0:0".parse().expect("static bind address"),
            IpAddr::V6(_) => "[::]:0".parse().expect("static bind address"),
        };

        match Snmp2cClient::new(
            target,
            self.config.community.as_bytes().to_vec(),
            Some(bind),
            Some(self.config.timeout_duration()),
            self.config.retries,
        )
        .await
        {
            Ok(client) => Some(client),
            Err(e) => {
                debug!("{address}: SNMP client setup failed: {e}");
                None
            }
        }
    }

    async fn get_u64(&self, client: &Snmp2cClient, address: IpAddr, oid: ObjectIdentifier) -> Option<u64> {
        match client.get(oid).await {
            Ok(value) => value_as_u64(&value),
            Err(e) => {
                trace!("{address}: SNMP get {oid} failed: {e}");
                None
            }
        }
    }

    async fn get_string(
        &self,
        client: &Snmp2cClient,
        address: IpAddr,
        oid: ObjectIdentifier,
    ) -> Option<String> {
        match client.get(oid).await {
            Ok(ObjectValue::String(bytes)) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Ok(other) => {
                trace!("{address}: SNMP get {oid} returned non-string value {other:?}");
                None
            }
            Err(e) => {
                trace!("{address}: SNMP get {oid} failed: {e}");
                None
            }
        }
    }

    /// Interface identity, from the cache when already known.
    async fn interface_info(&self, client: &Snmp2cClient, address: IpAddr) -> InterfaceInfo {
        if let Some(info) = self.interface_cache.read().await.get(&address) {
            return info.clone();
        }

        let info = InterfaceInfo {
            name: self.get_string(client, address, self.oid_interface_name).await,
            speed_bps: self.get_u64(client, address, self.oid_interface_speed).await,
        };

        // Cache only a useful answer; retry next cycle otherwise.
        if info.name.is_some() || info.speed_bps.is_some() {
            self.interface_cache
                .write()
                .await
                .insert(address, info.clone());
        }

        info
    }
}

#[async_trait]
impl CounterSource for SnmpCounterSource {
    async fn collect(&self, address: IpAddr) -> CounterReading {
        let Some(client) = self.connect(address).await else {
            return CounterReading::default();
        };

        let in_octets = self.get_u64(&client, address, self.oid_in_octets).await;
        let out_octets = self.get_u64(&client, address, self.oid_out_octets).await;

        let interface = if in_octets.is_some() || out_octets.is_some() {
            Some(self.interface_info(&client, address).await)
        } else {
            None
        };

        trace!("{address}: counters in={in_octets:?} out={out_octets:?}");

        CounterReading {
            in_octets,
            out_octets,
            interface,
        }
    }
}

fn oid(dotted: &str) -> ObjectIdentifier {
    dotted.parse().expect("static OID literal")
}

fn value_as_u64(value: &ObjectValue) -> Option<u64> {
    match value {
        ObjectValue::Counter64(v) => Some(*v),
        ObjectValue::Counter32(v) => Some(u64::from(*v)),
        ObjectValue::Unsigned32(v) => Some(u64::from(*v)),
        ObjectValue::TimeTicks(v) => Some(u64::from(*v)),
        ObjectValue::Integer(v) => u64::try_from(*v).ok(),
        _ => None,
    }
}
