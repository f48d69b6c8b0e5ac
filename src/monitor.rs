//! Poll scheduler / monitor loop
//!
//! One long-lived background task drives periodic, concurrent checks of all
//! registered devices: snapshot the registry, fan out probe+collect per
//! device, await everything, then apply the results sequentially so no
//! device's state is ever half-updated.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! `start()` on a running monitor is a logged no-op. `stop()` cancels the
//! in-flight cycle's outer waits and returns only after the loop task has
//! exited: per-device work that already finished when the token fired is
//! applied, the rest is discarded, and nothing lands afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alerts::AlertDispatcher;
use crate::config::MonitorConfig;
use crate::probe::{CounterReading, CounterSource, ProbeReport, Prober};
use crate::registry::DeviceRegistry;
use crate::sink::StatusSink;
use crate::{Device, HealthState};

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The monitoring core. One explicit instance per composed service.
pub struct Monitor {
    inner: Arc<MonitorInner>,
    running: tokio::sync::Mutex<Option<RunningLoop>>,
}

struct MonitorInner {
    registry: Arc<DeviceRegistry>,
    prober: Arc<dyn Prober>,
    counters: Arc<dyn CounterSource>,
    dispatcher: Arc<AlertDispatcher>,
    sinks: Vec<Arc<dyn StatusSink>>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        prober: Arc<dyn Prober>,
        counters: Arc<dyn CounterSource>,
        dispatcher: Arc<AlertDispatcher>,
        sinks: Vec<Arc<dyn StatusSink>>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                registry,
                prober,
                counters,
                dispatcher,
                sinks,
                config,
            }),
            running: tokio::sync::Mutex::new(None),
        }
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawn the monitor loop. No-op when already running.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("monitor already running, ignoring start request");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(Arc::clone(&self.inner), cancel.clone()));
        *running = Some(RunningLoop { cancel, handle });
        info!("monitoring started");
    }

    /// Signal cancellation and wait for the in-flight cycle to resolve.
    ///
    /// After this returns, no registry update, alert, or sink write from
    /// this monitor is outstanding.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            debug!("monitor not running, ignoring stop request");
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            error!("monitor loop task failed: {e}");
        }
        info!("monitoring stopped");
    }

    /// Run a single poll cycle outside the scheduled loop.
    pub async fn poll_once(&self) {
        self.inner.run_cycle(&CancellationToken::new()).await;
    }
}

#[instrument(skip_all)]
async fn run_loop(inner: Arc<MonitorInner>, cancel: CancellationToken) {
    debug!("monitor loop started");

    loop {
        let cycle_start = Instant::now();
        inner.run_cycle(&cancel).await;

        if cancel.is_cancelled() {
            break;
        }

        // Self-correcting cadence: an overrunning cycle starts the next one
        // immediately instead of queueing a backlog.
        let wait = inner.config.period().saturating_sub(cycle_start.elapsed());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    debug!("monitor loop stopped");
}

impl MonitorInner {
    /// Upper bound on one device's probe, derived from the sub-probe budget.
    fn probe_budget(&self) -> Duration {
        self.config.ping.timeout_duration() * self.config.ping.attempts.max(1) as u32
            + Duration::from_secs(1)
    }

    /// Upper bound on one device's counter collection.
    fn collect_budget(&self) -> Duration {
        // up to four queries (two counters + cached interface identity)
        self.config.snmp.timeout_duration() * (self.config.snmp.retries + 1) as u32 * 4
            + Duration::from_secs(1)
    }

    async fn run_cycle(&self, cancel: &CancellationToken) {
        let devices = self.registry.devices().await;
        if devices.is_empty() {
            trace!("no devices registered, idle cycle");
            return;
        }

        trace!("polling {} devices", devices.len());
        let probe_budget = self.probe_budget();
        let collect_budget = self.collect_budget();

        let checks = devices.into_iter().map(|device| {
            let prober = Arc::clone(&self.prober);
            let counters = Arc::clone(&self.counters);
            let ping = self.config.ping.clone();
            let cancel = cancel.clone();

            async move {
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = check_device(prober, counters, &device, &ping, probe_budget, collect_budget) => {
                        Some((device, result))
                    }
                }
            }
        });

        let results = futures::future::join_all(checks).await;

        // Sequential apply: each device's state update is serialized, and a
        // cancelled cycle still applies whatever had already completed.
        let mut applied = 0usize;
        for (device, (report, counters)) in results.into_iter().flatten() {
            applied += 1;
            let now = Utc::now();
            if let Some(event) = self
                .registry
                .apply_check(&device.name, report, counters, now)
                .await
            {
                info!(
                    "device {} changed from {} to {}",
                    event.device_name, event.previous_status, event.new_status
                );
                self.dispatcher.publish(&event).await;
                for sink in &self.sinks {
                    if let Err(e) = sink.record_alert(&event).await {
                        error!("status sink failed to record alert: {e:#}");
                    }
                }
            }
        }
        trace!("cycle applied {applied} device results");

        if !self.sinks.is_empty() {
            let snapshot = self.registry.list_status().await;
            for sink in &self.sinks {
                if let Err(e) = sink.record_statuses(&snapshot).await {
                    error!("status sink failed to record snapshot: {e:#}");
                }
            }
        }
    }
}

/// Probe and, when reachable, collect counters for one device.
///
/// Every await is bounded: a hung prober is reported as `timeout`, a hung
/// collector as an empty reading. Neither can stall the cycle.
async fn check_device(
    prober: Arc<dyn Prober>,
    counters: Arc<dyn CounterSource>,
    device: &Device,
    ping: &crate::config::PingConfig,
    probe_budget: Duration,
    collect_budget: Duration,
) -> (ProbeReport, Option<CounterReading>) {
    let probe = prober.probe(device.ip_address, ping.timeout_duration(), ping.attempts);
    let report = match tokio::time::timeout(probe_budget, probe).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            warn!("{}: probe failed: {e:#}", device.name);
            ProbeReport {
                status: HealthState::Error,
                response_time: None,
                packet_loss: 100.0,
            }
        }
        Err(_) => {
            warn!(
                "{}: probe exceeded its {probe_budget:?} budget",
                device.name
            );
            ProbeReport::timed_out()
        }
    };

    let reading = if report.status.is_reachable() {
        match tokio::time::timeout(collect_budget, counters.collect(device.ip_address)).await {
            Ok(reading) => Some(reading),
            Err(_) => {
                warn!(
                    "{}: counter collection exceeded its {collect_budget:?} budget",
                    device.name
                );
                Some(CounterReading::default())
            }
        }
    } else {
        None
    };

    (report, reading)
}
