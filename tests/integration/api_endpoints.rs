//! HTTP API endpoints over a seeded registry

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use device_monitoring::api::{ApiConfig, ApiState, spawn_api_server};
use device_monitoring::probe::{CounterReading, ProbeReport};
use device_monitoring::registry::DeviceRegistry;
use device_monitoring::HealthState;
use pretty_assertions::assert_eq;

use crate::helpers::{device, online};

async fn serve(registry: Arc<DeviceRegistry>) -> String {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: false,
    };
    let addr = spawn_api_server(config, ApiState::new(registry))
        .await
        .expect("server must bind");
    format!("http://{addr}")
}

fn counters(in_octets: u64, out_octets: u64) -> Option<CounterReading> {
    Some(CounterReading {
        in_octets: Some(in_octets),
        out_octets: Some(out_octets),
        interface: None,
    })
}

async fn seeded_registry() -> Arc<DeviceRegistry> {
    let registry = Arc::new(DeviceRegistry::new(50));
    registry.add(device("Router-001", "192.168.1.1")).await.unwrap();
    registry.add(device("Switch-001", "192.168.1.10")).await.unwrap();

    // two counter samples 10 s apart: 8000 octets each way -> 12.8 kbit/s
    registry
        .apply_check(
            "Router-001",
            online(),
            counters(1_000, 1_000),
            Utc.timestamp_opt(100, 0).unwrap(),
        )
        .await;
    registry
        .apply_check(
            "Router-001",
            online(),
            counters(9_000, 9_000),
            Utc.timestamp_opt(110, 0).unwrap(),
        )
        .await;

    registry
}

#[tokio::test]
async fn list_devices_returns_every_status() {
    let base = serve(seeded_registry().await).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/v1/devices"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["count"], 2);
    assert_eq!(body["devices"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_device_preserves_wire_field_names() {
    let base = serve(seeded_registry().await).await;

    let response = reqwest::get(format!("{base}/api/v1/devices/Router-001"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Router-001");
    assert_eq!(body["ip_address"], "192.168.1.1");
    assert_eq!(body["status"], "online");
    assert_eq!(body["packet_loss"], 0.0);
    assert_eq!(body["line"], "Ligne 1");
    assert_eq!(body["workshop"], "Atelier A");

    // throughput rides under its historical wire name
    let data_rate = body["data_rate"].as_f64().expect("data_rate present");
    assert!((data_rate - 0.0128).abs() < 1e-9);

    // ISO-8601 timestamp
    let last_checked = body["last_checked"].as_str().unwrap();
    assert!(last_checked.starts_with("1970-01-01T00:01:50"));
}

#[tokio::test]
async fn unknown_device_is_a_404() {
    let base = serve(seeded_registry().await).await;

    let response = reqwest::get(format!("{base}/api/v1/devices/Ghost-001"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Ghost-001"));
}

#[tokio::test]
async fn history_is_chronological_and_limit_bounded() {
    let registry = Arc::new(DeviceRegistry::new(50));
    registry.add(device("Router-001", "192.168.1.1")).await.unwrap();
    for n in 0..6 {
        registry
            .apply_check(
                "Router-001",
                ProbeReport {
                    status: HealthState::Online,
                    response_time: Some(n as f64),
                    packet_loss: 0.0,
                },
                None,
                Utc.timestamp_opt(n, 0).unwrap(),
            )
            .await;
    }
    let base = serve(registry).await;

    let body: serde_json::Value =
        reqwest::get(format!("{base}/api/v1/devices/Router-001/history?limit=3"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

    assert_eq!(body["count"], 3);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history[0]["response_time"], 3.0);
    assert_eq!(history[2]["response_time"], 5.0);
    assert_eq!(history[0]["status"], "online");
}

#[tokio::test]
async fn history_for_unknown_device_is_empty_not_an_error() {
    let base = serve(seeded_registry().await).await;

    let response = reqwest::get(format!("{base}/api/v1/devices/Ghost-001/history"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn health_reports_device_count() {
    let base = serve(seeded_registry().await).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/api/v1/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["devices"], 2);
}
