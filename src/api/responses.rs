//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{services::PendingWakeUp, state::TabId};

/// Body of `POST /tabs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTabRequest {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Result of an external tab removal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRemovedResponse {
    pub tab_id: TabId,
    pub removed: bool,
}

/// Service status with timer and wake-up counts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub tracked_timers: usize,
    pub pending_wake_ups: Vec<PendingWakeUp>,
    pub open_tabs: usize,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
