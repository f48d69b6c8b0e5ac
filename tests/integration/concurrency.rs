//! Concurrency: stop-drain semantics, concurrent queries, runtime mutation

use std::time::Duration;

use device_monitoring::HealthState;
use device_monitoring::config::{MonitorConfig, PingConfig};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn stop_applies_completed_results_and_discards_the_rest() {
    // generous budget so only stop(), not the budget, can end the hung probe
    let config = MonitorConfig {
        interval: 60,
        history_capacity: 50,
        ping: PingConfig {
            timeout: 2,
            attempts: 2,
        },
        ..MonitorConfig::default()
    };
    let rig = rig(config).await;
    rig.registry.add(device("Fast-001", "10.0.0.1")).await.unwrap();
    rig.registry.add(device("Slow-001", "10.0.0.2")).await.unwrap();
    rig.prober.script("10.0.0.2", vec![ProbeStep::Hang]);

    rig.monitor.start().await;

    // let the first cycle get in flight: fast device done, slow one hanging
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped = tokio::time::Instant::now();
    rig.monitor.stop().await;
    assert!(
        stopped.elapsed() < Duration::from_secs(2),
        "stop() must cancel the hung probe's outer wait, not sit out its budget"
    );

    // completed work was applied...
    let fast = rig.registry.status("Fast-001").await.unwrap();
    assert_eq!(fast.status, HealthState::Online);
    assert_eq!(rig.registry.history("Fast-001", usize::MAX).await.len(), 1);

    // ...the hung device was discarded, not marked
    let slow = rig.registry.status("Slow-001").await.unwrap();
    assert_eq!(slow.status, HealthState::Unknown);
    assert!(rig.registry.history("Slow-001", usize::MAX).await.is_empty());

    // and nothing lands after stop() has returned
    let fast_len = rig.registry.history("Fast-001", usize::MAX).await.len();
    let snapshots = rig.sink.recorded_statuses().await.len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(rig.registry.history("Fast-001", usize::MAX).await.len(), fast_len);
    assert_eq!(rig.sink.recorded_statuses().await.len(), snapshots);
}

#[tokio::test]
async fn status_queries_run_concurrently_with_polling() {
    let rig = rig(fast_config()).await;
    for n in 0..8 {
        rig.registry
            .add(device(&format!("Device-{n:03}"), &format!("10.0.1.{n}")))
            .await
            .unwrap();
    }

    let registry = rig.registry.clone();
    let reader = tokio::spawn(async move {
        for _ in 0..200 {
            let statuses = registry.list_status().await;
            assert_eq!(statuses.len(), 8);
            let _ = registry.history("Device-003", 10).await;
            tokio::task::yield_now().await;
        }
    });

    for _ in 0..5 {
        rig.monitor.poll_once().await;
    }

    reader.await.expect("reader task must not panic");

    for n in 0..8 {
        let status = rig.registry.status(&format!("Device-{n:03}")).await.unwrap();
        assert_eq!(status.status, HealthState::Online);
    }
}

#[tokio::test]
async fn removed_device_is_skipped_on_later_cycles() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Keep-001", "10.0.0.1")).await.unwrap();
    rig.registry.add(device("Drop-001", "10.0.0.2")).await.unwrap();

    rig.monitor.poll_once().await;
    assert_eq!(rig.prober.calls(), 2);

    rig.registry.remove("Drop-001").await.unwrap();
    rig.monitor.poll_once().await;

    assert_eq!(rig.prober.calls(), 3, "only the remaining device is polled");
    assert_eq!(rig.registry.history("Keep-001", usize::MAX).await.len(), 2);
    assert!(rig.registry.status("Drop-001").await.is_err());
}

#[tokio::test]
async fn device_added_at_runtime_joins_the_next_cycle() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Router-001", "10.0.0.1")).await.unwrap();

    rig.monitor.poll_once().await;

    rig.registry.add(device("Router-002", "10.0.0.2")).await.unwrap();
    rig.monitor.poll_once().await;

    let status = rig.registry.status("Router-002").await.unwrap();
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(rig.registry.history("Router-002", usize::MAX).await.len(), 1);
}
