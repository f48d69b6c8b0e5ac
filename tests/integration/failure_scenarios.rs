//! Failure isolation: one broken device never drags down the cycle

use device_monitoring::HealthState;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn hung_probe_becomes_timeout_and_others_still_apply() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Hung-001", "10.0.0.1")).await.unwrap();
    rig.registry.add(device("Router-002", "10.0.0.2")).await.unwrap();
    rig.registry.add(device("Router-003", "10.0.0.3")).await.unwrap();
    rig.prober.script("10.0.0.1", vec![ProbeStep::Hang]);

    // the hung device is cut off by the per-device budget (~2s here)
    rig.monitor.poll_once().await;

    let hung = rig.registry.status("Hung-001").await.unwrap();
    assert_eq!(hung.status, HealthState::Timeout, "hung, not missing");
    assert_eq!(hung.packet_loss, 100.0);
    assert!(hung.last_checked.is_some());

    for name in ["Router-002", "Router-003"] {
        let status = rig.registry.status(name).await.unwrap();
        assert_eq!(status.status, HealthState::Online);
        assert_eq!(rig.registry.history(name, usize::MAX).await.len(), 1);
    }
}

#[tokio::test]
async fn probe_mechanism_failure_is_recorded_as_error_state() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Broken-001", "10.0.0.1")).await.unwrap();
    rig.registry.add(device("Router-002", "10.0.0.2")).await.unwrap();
    rig.prober.script("10.0.0.1", vec![ProbeStep::Fail]);

    rig.monitor.poll_once().await;

    let broken = rig.registry.status("Broken-001").await.unwrap();
    assert_eq!(broken.status, HealthState::Error);
    assert_eq!(broken.packet_loss, 100.0);

    // the healthy neighbour is untouched
    assert_eq!(
        rig.registry.status("Router-002").await.unwrap().status,
        HealthState::Online
    );
}

#[tokio::test]
async fn missing_counters_leave_status_online_without_throughput() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Router-001", "10.0.0.1")).await.unwrap();
    // no counter script: every collection comes back empty

    rig.monitor.poll_once().await;
    rig.monitor.poll_once().await;

    let status = rig.registry.status("Router-001").await.unwrap();
    assert_eq!(status.status, HealthState::Online);
    assert_eq!(status.throughput, None);
    assert_eq!(rig.registry.history("Router-001", usize::MAX).await.len(), 2);
}

#[tokio::test]
async fn counter_gap_between_samples_restarts_the_baseline() {
    let rig = rig(fast_config()).await;
    rig.registry.add(device("Router-001", "10.0.0.1")).await.unwrap();
    rig.counters.script(
        "10.0.0.1",
        vec![
            reading(1_000, 1_000),
            // device answered ping but not SNMP this cycle
            Default::default(),
            reading(9_000, 9_000),
        ],
    );

    let pause = || tokio::time::sleep(std::time::Duration::from_millis(20));

    rig.monitor.poll_once().await;
    pause().await;
    rig.monitor.poll_once().await;
    pause().await;
    rig.monitor.poll_once().await;

    // the third reading may not be computed against the first one
    let status = rig.registry.status("Router-001").await.unwrap();
    assert_eq!(status.throughput, None);
}

#[tokio::test]
async fn transition_alerts_survive_a_failing_webhook() {
    use std::sync::Arc;

    use device_monitoring::alerts::{AlertDispatcher, WebhookAlerter};
    use device_monitoring::config::Webhook;
    use device_monitoring::monitor::Monitor;
    use device_monitoring::registry::DeviceRegistry;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let registry = Arc::new(DeviceRegistry::new(50));
    let prober = Arc::new(ScriptedProber::new());
    let collecting = Arc::new(CollectingSink::new());

    let dispatcher = Arc::new(AlertDispatcher::new());
    // the failing webhook is registered first and must not stop the second sink
    dispatcher
        .subscribe(Arc::new(WebhookAlerter::new(Webhook {
            url: mock_server.uri(),
        })))
        .await;
    dispatcher.subscribe(collecting.clone()).await;

    let monitor = Monitor::new(
        registry.clone(),
        prober.clone(),
        Arc::new(ScriptedCounters::new()),
        dispatcher,
        vec![],
        fast_config(),
    );

    registry.add(device("Router-001", "10.0.0.1")).await.unwrap();
    prober.script(
        "10.0.0.1",
        vec![ProbeStep::Report(online()), ProbeStep::Report(offline())],
    );

    monitor.poll_once().await;
    monitor.poll_once().await;

    let events = collecting.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].new_status, HealthState::Offline);
}
