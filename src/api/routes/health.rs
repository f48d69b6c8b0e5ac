//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};

use crate::api::state::ApiState;

/// GET /api/v1/health
pub async fn health_check(State(state): State<ApiState>) -> Json<Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds();

    Json(json!({
        "status": "ok",
        "devices": state.registry.len().await,
        "uptime_seconds": uptime,
    }))
}
