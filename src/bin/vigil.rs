use std::sync::Arc;

use clap::Parser;
use device_monitoring::{
    alerts::{AlertDispatcher, LogAlerter, WebhookAlerter},
    config::{AlertConfig, read_config_file},
    monitor::Monitor,
    probe::{IcmpProber, SnmpCounterSource},
    registry::DeviceRegistry,
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("device_monitoring", LevelFilter::TRACE),
        ("vigil", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let registry = Arc::new(DeviceRegistry::new(config.monitor.history_capacity));
    for device_config in config.devices.clone().unwrap_or_default() {
        registry.add(device_config.into()).await?;
    }
    debug!("registered {} devices", registry.len().await);

    let dispatcher = Arc::new(AlertDispatcher::new());
    dispatcher.subscribe(Arc::new(LogAlerter)).await;
    if let Some(AlertConfig::Webhook(webhook)) = config.alerts.clone() {
        dispatcher.subscribe(Arc::new(WebhookAlerter::new(webhook))).await;
    }

    // Fatal when the process may not open ICMP sockets - better to die here
    // than to poll forever with a prober that can never succeed.
    let prober = Arc::new(IcmpProber::new()?);
    let counters = Arc::new(SnmpCounterSource::new(config.monitor.snmp.clone()));

    let monitor = Monitor::new(
        registry.clone(),
        prober,
        counters,
        dispatcher,
        vec![],
        config.monitor.clone(),
    );

    #[cfg(feature = "api")]
    if let Some(api) = &config.api {
        use device_monitoring::api::{ApiConfig, ApiState, spawn_api_server};

        let api_config = ApiConfig {
            bind_addr: api.bind,
            ..ApiConfig::default()
        };
        spawn_api_server(api_config, ApiState::new(registry.clone())).await?;
    }

    monitor.start().await;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    monitor.stop().await;

    Ok(())
}
