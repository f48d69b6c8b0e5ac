//! API shared state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::registry::DeviceRegistry;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Registry backing all status and history queries
    pub registry: Arc<DeviceRegistry>,

    /// When this process started serving
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            started_at: Utc::now(),
        }
    }
}
