//! Device status and history endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};

/// Query parameters for history reads
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Max samples to return (default: 20)
    limit: Option<usize>,
}

/// GET /api/v1/devices
///
/// Current status of every monitored device
pub async fn list_devices(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let statuses = state.registry.list_status().await;

    Ok(Json(json!({
        "devices": statuses,
        "count": statuses.len(),
    })))
}

/// GET /api/v1/devices/:name
///
/// Current status of one device, 404 when unregistered
pub async fn get_device(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.registry.status(&name).await?;
    Ok(Json(serde_json::to_value(status).map_err(anyhow::Error::from)?))
}

/// GET /api/v1/devices/:name/history
///
/// Recent history samples in chronological order. An unregistered device
/// yields an empty list, mirroring the registry contract.
pub async fn get_device_history(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(20).min(1000);
    let history = state.registry.history(&name, limit).await;

    Ok(Json(json!({
        "name": name,
        "count": history.len(),
        "history": history,
    })))
}
