use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use crate::{Device, DeviceTags};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub devices: Option<Vec<DeviceConfig>>,

    /// Monitoring settings (optional - defaults match a small LAN deployment)
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Alert delivery configuration
    pub alerts: Option<AlertConfig>,

    /// HTTP API configuration
    pub api: Option<ApiBindConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub ip: IpAddr,
    pub line: Option<String>,
    pub workshop: Option<String>,
}

impl From<DeviceConfig> for Device {
    fn from(config: DeviceConfig) -> Self {
        Device {
            name: config.name,
            ip_address: config.ip,
            tags: DeviceTags {
                line: config.line,
                workshop: config.workshop,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Poll period in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// History ring capacity per device
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default)]
    pub ping: PingConfig,

    #[serde(default)]
    pub snmp: SnmpConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            history_capacity: default_history_capacity(),
            ping: PingConfig::default(),
            snmp: SnmpConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingConfig {
    /// Per-probe timeout in seconds
    #[serde(default = "default_ping_timeout")]
    pub timeout: u64,

    /// Echo requests per poll cycle
    #[serde(default = "default_ping_attempts")]
    pub attempts: usize,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            timeout: default_ping_timeout(),
            attempts: default_ping_attempts(),
        }
    }
}

impl PingConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_snmp_community")]
    pub community: String,

    #[serde(default = "default_snmp_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_snmp_timeout")]
    pub timeout: u64,

    #[serde(default = "default_snmp_retries")]
    pub retries: usize,

    /// Interface whose octet counters are polled
    #[serde(default = "default_interface_index")]
    pub interface_index: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_snmp_community(),
            port: default_snmp_port(),
            timeout: default_snmp_timeout(),
            retries: default_snmp_retries(),
            interface_index: default_interface_index(),
        }
    }
}

impl SnmpConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertConfig {
    Webhook(Webhook),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBindConfig {
    pub bind: SocketAddr,
}

fn default_interval() -> u64 {
    5
}

fn default_history_capacity() -> usize {
    50
}

fn default_ping_timeout() -> u64 {
    5
}

fn default_ping_attempts() -> usize {
    4
}

fn default_snmp_community() -> String {
    String::from("public")
}

fn default_snmp_port() -> u16 {
    161
}

fn default_snmp_timeout() -> u64 {
    2
}

fn default_snmp_retries() -> usize {
    1
}

fn default_interface_index() -> u32 {
    1
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
