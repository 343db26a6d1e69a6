//! Application state for API handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use revive_state::DeviceStateStore;

use crate::intake::AlertIntake;
use crate::scheduler::RecoveryOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Alert intake service
    pub intake: Arc<AlertIntake>,

    /// Tracked devices
    pub store: Arc<DeviceStateStore>,

    /// Recovery loop handle
    pub orchestrator: Arc<RecoveryOrchestrator>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        intake: Arc<AlertIntake>,
        store: Arc<DeviceStateStore>,
        orchestrator: Arc<RecoveryOrchestrator>,
    ) -> Self {
        Self {
            intake,
            store,
            orchestrator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (Utc::now() - self.started_at).num_seconds();

        match secs {
            s if s < 60 => format!("{}s", s),
            s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
            s if s < 86400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
            s => format!("{}d {}h", s / 86400, (s % 86400) / 3600),
        }
    }
}
