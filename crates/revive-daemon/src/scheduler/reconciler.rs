//! Recovery loop
//!
//! Each pass walks every tracked device through restore, rediscover,
//! refresh, and status check. A device whose interface reads "up" is
//! removed; anything else is isolated again and retried on the next pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use revive_remediation::Remediation;
use revive_state::{DeviceStateStore, Removal};
use revive_types::{DeviceId, DeviceRecoveryRecord, OperStatus};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use super::wake::WakeSignal;
use crate::config::RecoveryConfig;

/// What happened to one device during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeviceOutcome {
    /// Interface up; record removed.
    Recovered,

    /// Interface not up; device isolated again.
    StillDown { status: OperStatus, attempts: u32 },

    /// Address could not be restored; nothing else was attempted.
    RestoreFailed { reason: String },

    /// Interface up, but an alert re-armed the device mid-attempt; device
    /// isolated again.
    Superseded,

    /// Record disappeared while the attempt ran.
    Vanished,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub devices: BTreeMap<DeviceId, DeviceOutcome>,
}

impl PassReport {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn recovered(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeviceOutcome::Recovered))
    }

    pub fn still_down(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeviceOutcome::StillDown { .. }))
    }

    pub fn restore_failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeviceOutcome::RestoreFailed { .. }))
    }

    pub fn superseded(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeviceOutcome::Superseded))
    }

    fn count(&self, predicate: impl Fn(&DeviceOutcome) -> bool) -> usize {
        self.devices.values().filter(|outcome| predicate(outcome)).count()
    }
}

/// Drives tracked devices back to health.
pub struct RecoveryOrchestrator {
    config: RecoveryConfig,
    store: Arc<DeviceStateStore>,
    remediation: Arc<dyn Remediation>,
    wake: Arc<WakeSignal>,
    last_pass: RwLock<Option<PassReport>>,
}

impl RecoveryOrchestrator {
    pub fn new(
        config: RecoveryConfig,
        store: Arc<DeviceStateStore>,
        remediation: Arc<dyn Remediation>,
        wake: Arc<WakeSignal>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            remediation,
            wake,
            last_pass: RwLock::new(None),
        })
    }

    pub fn wake_signal(&self) -> Arc<WakeSignal> {
        self.wake.clone()
    }

    pub fn is_active(&self) -> bool {
        self.wake.is_active()
    }

    pub async fn last_pass(&self) -> Option<PassReport> {
        self.last_pass.read().await.clone()
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Idles while the store is empty; otherwise sleeps one interval and
    /// runs a pass.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_concurrent = self.config.max_concurrent,
            "Recovery loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.store.is_empty().await {
                if self.wake.is_active() {
                    info!("All devices recovered; recovery loop idle until next alert");
                }
                self.wake.set_active(false);

                tokio::select! {
                    _ = self.wake.wait() => continue,
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }

            if !self.wake.is_active() {
                let devices = self.store.len().await;
                info!(
                    devices,
                    next_pass_in_secs = self.config.interval.as_secs(),
                    "Recovery loop active"
                );
                self.wake.set_active(true);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            let report = self.run_pass().await;
            info!(
                devices = report.devices.len(),
                recovered = report.recovered(),
                still_down = report.still_down(),
                restore_failed = report.restore_failed(),
                superseded = report.superseded(),
                "Recovery pass finished"
            );
            *self.last_pass.write().await = Some(report);
        }

        self.wake.set_active(false);
        info!("Recovery loop stopped");
    }

    /// One pass over every device tracked when the pass starts.
    pub async fn run_pass(&self) -> PassReport {
        let started_at = Utc::now();
        let tracked = self.store.snapshot().await;

        debug!(devices = tracked.len(), "Starting recovery pass");

        let devices = stream::iter(tracked)
            .map(|(device_id, record)| async move {
                let outcome = self.recover_device(&device_id, record).await;
                (device_id, outcome)
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect::<BTreeMap<_, _>>()
            .await;

        PassReport {
            started_at,
            finished_at: Utc::now(),
            devices,
        }
    }

    async fn recover_device(
        &self,
        device_id: &DeviceId,
        record: DeviceRecoveryRecord,
    ) -> DeviceOutcome {
        let observed_revision = record.revision;

        if let Err(e) = self
            .remediation
            .restore(device_id, &record.original_address)
            .await
        {
            warn!(
                device_id = %device_id,
                hostname = %record.hostname,
                error = %e,
                "Restore failed; device stays isolated until the next pass"
            );
            return DeviceOutcome::RestoreFailed {
                reason: e.to_string(),
            };
        }

        self.remediation.rediscover(device_id).await;
        self.remediation.refresh_status(device_id).await;

        let port_id = match record.tracked_interface_id {
            Some(port_id) => Some(port_id),
            None => {
                let resolved = self
                    .remediation
                    .resolve_interface_id(device_id, &self.config.target_interface)
                    .await;
                if let Some(port_id) = &resolved {
                    info!(device_id = %device_id, port_id = %port_id, "Resolved tracked interface");
                    self.store.set_interface_id(device_id, port_id.clone()).await;
                }
                resolved
            }
        };

        let status = match &port_id {
            Some(port_id) => self.remediation.interface_operational_status(port_id).await,
            None => OperStatus::Unknown,
        };

        info!(
            device_id = %device_id,
            hostname = %record.hostname,
            interface = %self.config.target_interface,
            status = %status,
            "Interface status"
        );

        if status.is_up() {
            return match self
                .store
                .remove_if_revision(device_id, observed_revision)
                .await
            {
                Removal::Removed => {
                    info!(device_id = %device_id, hostname = %record.hostname, "Device recovered");
                    DeviceOutcome::Recovered
                }
                Removal::Superseded { current_revision } => {
                    info!(
                        device_id = %device_id,
                        observed_revision,
                        current_revision,
                        "Device re-alerted during recovery; keeping it isolated"
                    );
                    self.remediation
                        .isolate(device_id, &self.config.unsupervised_address)
                        .await;
                    DeviceOutcome::Superseded
                }
                Removal::Missing => DeviceOutcome::Vanished,
            };
        }

        self.remediation
            .isolate(device_id, &self.config.unsupervised_address)
            .await;

        match self.store.record_failed_attempt(device_id).await {
            Some(attempts) => {
                let escalate_after = self.config.escalate_after_attempts;
                if escalate_after > 0 && attempts >= escalate_after {
                    error!(
                        device_id = %device_id,
                        hostname = %record.hostname,
                        attempts,
                        "Device still not recovered"
                    );
                } else {
                    info!(
                        device_id = %device_id,
                        hostname = %record.hostname,
                        attempts,
                        "Device still down; isolated again"
                    );
                }
                DeviceOutcome::StillDown { status, attempts }
            }
            None => DeviceOutcome::Vanished,
        }
    }
}
