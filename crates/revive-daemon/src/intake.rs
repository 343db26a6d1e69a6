//! Alert intake
//!
//! Turns a LibreNMS alert into a tracked, isolated device and wakes the
//! recovery loop.

use std::sync::Arc;

use revive_remediation::Remediation;
use revive_state::{DeviceStateStore, RegisterOutcome, Registration};
use revive_types::{json_scalar, DeviceId};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::scheduler::WakeSignal;

/// Reasons an alert is rejected without touching state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("missing {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("device {device_id} reports the isolation address {address}")]
    IsolationAddress { device_id: DeviceId, address: String },
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::MissingFields(fields) => ApiError::MissingFields(fields.join(", ")),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Identity fields pulled from an alert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFields {
    pub device_id: DeviceId,
    pub hostname: String,
    pub address: String,
}

impl AlertFields {
    /// Read the fields from the top level or the nested `device` object.
    /// The first non-empty candidate wins; numbers are accepted.
    pub fn extract(payload: &Value) -> Result<Self, IntakeError> {
        let device_id = first_present(payload, &[&["device_id"], &["device", "device_id"]]);
        let hostname = first_present(payload, &[&["host"], &["device", "hostname"]]);
        let address = first_present(
            payload,
            &[&["ip"], &["device", "ip"], &["device", "overwrite_ip"]],
        );

        match (device_id, hostname, address) {
            (Some(device_id), Some(hostname), Some(address)) => Ok(Self {
                device_id: DeviceId::new(device_id),
                hostname,
                address,
            }),
            (device_id, hostname, address) => {
                let missing = [
                    ("device_id", device_id.is_none()),
                    ("hostname", hostname.is_none()),
                    ("ip", address.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(IntakeError::MissingFields(missing))
            }
        }
    }
}

fn first_present(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(payload, |value, key| value.get(key))
            .and_then(json_scalar)
    })
}

/// Accepts alerts and starts recovery for the device they name.
pub struct AlertIntake {
    store: Arc<DeviceStateStore>,
    remediation: Arc<dyn Remediation>,
    wake: Arc<WakeSignal>,
    target_interface: String,
    unsupervised_address: String,
}

impl AlertIntake {
    pub fn new(
        store: Arc<DeviceStateStore>,
        remediation: Arc<dyn Remediation>,
        wake: Arc<WakeSignal>,
        target_interface: impl Into<String>,
        unsupervised_address: impl Into<String>,
    ) -> Self {
        Self {
            store,
            remediation,
            wake,
            target_interface: target_interface.into(),
            unsupervised_address: unsupervised_address.into(),
        }
    }

    /// Track, isolate, and schedule recovery for the device in `payload`.
    pub async fn accept(&self, payload: &Value) -> Result<RegisterOutcome, IntakeError> {
        let fields = AlertFields::extract(payload)?;
        let device_id = fields.device_id;

        if fields.address == self.unsupervised_address && !self.store.contains(&device_id).await {
            return Err(IntakeError::IsolationAddress {
                device_id,
                address: fields.address,
            });
        }

        let interface = self
            .remediation
            .resolve_interface_id(&device_id, &self.target_interface)
            .await;
        if interface.is_none() {
            warn!(
                device_id = %device_id,
                interface = %self.target_interface,
                "Tracked interface not found; will retry during recovery"
            );
        }

        let outcome = self
            .store
            .register(
                &device_id,
                Registration {
                    hostname: fields.hostname,
                    address: fields.address,
                    interface,
                },
            )
            .await;

        let record = outcome.record();
        info!(
            device_id = %device_id,
            hostname = %record.hostname,
            address = %record.original_address,
            port_id = ?record.tracked_interface_id,
            revision = record.revision,
            rearmed = matches!(outcome, RegisterOutcome::Rearmed(_)),
            "Alert accepted"
        );

        self.remediation
            .isolate(&device_id, &self.unsupervised_address)
            .await;
        self.wake.wake();

        Ok(outcome)
    }
}
