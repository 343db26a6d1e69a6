//! Health and status handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use revive_types::{DeviceId, DeviceRecoveryRecord};
use serde::Serialize;

use crate::api::rest::state::AppState;
use crate::scheduler::PassReport;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Recovery status response
#[derive(Debug, Serialize)]
pub struct RecoveryStatusResponse {
    /// Whether the recovery loop has devices to work on
    pub active: bool,
    pub tracked: usize,
    pub devices: BTreeMap<DeviceId, DeviceRecoveryRecord>,
    pub last_pass: Option<PassReport>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// Recovery status endpoint
pub async fn recovery_status(State(state): State<AppState>) -> Json<RecoveryStatusResponse> {
    let devices: BTreeMap<_, _> = state.store.snapshot().await.into_iter().collect();

    Json(RecoveryStatusResponse {
        active: state.orchestrator.is_active(),
        tracked: devices.len(),
        devices,
        last_pass: state.orchestrator.last_pass().await,
        started_at: state.started_at,
    })
}
