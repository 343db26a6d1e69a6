//! Scripted remediation for tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use revive_types::{DeviceId, OperStatus, PortId};

use crate::client::Remediation;
use crate::error::{RemediationError, RemediationResult};

/// One recorded call against [`ScriptedRemediation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationCall {
    Isolate { device_id: DeviceId, address: String },
    Restore { device_id: DeviceId, address: String },
    Rediscover { device_id: DeviceId },
    Refresh { device_id: DeviceId },
    ReadStatus { port_id: PortId },
    Resolve { device_id: DeviceId, interface_name: String },
}

impl RemediationCall {
    /// Device the call targeted, if it names one.
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            RemediationCall::Isolate { device_id, .. }
            | RemediationCall::Restore { device_id, .. }
            | RemediationCall::Rediscover { device_id }
            | RemediationCall::Refresh { device_id }
            | RemediationCall::Resolve { device_id, .. } => Some(device_id),
            RemediationCall::ReadStatus { .. } => None,
        }
    }
}

#[derive(Default)]
struct Script {
    calls: Vec<RemediationCall>,
    statuses: BTreeMap<PortId, VecDeque<OperStatus>>,
    ports: BTreeMap<DeviceId, PortId>,
    failing_restores: BTreeSet<DeviceId>,
}

/// Remediation that records every call and answers from a script.
///
/// Status reads pop from a per-port queue and report `Unknown` once it is
/// exhausted.
#[derive(Default)]
pub struct ScriptedRemediation {
    script: Mutex<Script>,
}

impl ScriptedRemediation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `device_id`'s target interface to `port_id`.
    pub fn with_port(self, device_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        self.lock()
            .ports
            .insert(DeviceId::new(device_id), PortId::new(port_id));
        self
    }

    /// Queue the next status reported for `port_id`.
    pub fn push_status(&self, port_id: impl Into<String>, status: OperStatus) {
        self.lock()
            .statuses
            .entry(PortId::new(port_id))
            .or_default()
            .push_back(status);
    }

    /// Make every restore of `device_id` fail.
    pub fn fail_restore(&self, device_id: impl Into<String>) {
        self.lock().failing_restores.insert(DeviceId::new(device_id));
    }

    pub fn calls(&self) -> Vec<RemediationCall> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, device_id: &DeviceId) -> Vec<RemediationCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.device_id() == Some(device_id))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: RemediationCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl Remediation for ScriptedRemediation {
    async fn isolate(&self, device_id: &DeviceId, override_address: &str) {
        self.record(RemediationCall::Isolate {
            device_id: device_id.clone(),
            address: override_address.to_string(),
        });
    }

    async fn restore(
        &self,
        device_id: &DeviceId,
        original_address: &str,
    ) -> RemediationResult<()> {
        self.record(RemediationCall::Restore {
            device_id: device_id.clone(),
            address: original_address.to_string(),
        });

        if self.lock().failing_restores.contains(device_id) {
            return Err(RemediationError::RemoteCallFailed {
                operation: "restore",
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn rediscover(&self, device_id: &DeviceId) {
        self.record(RemediationCall::Rediscover {
            device_id: device_id.clone(),
        });
    }

    async fn refresh_status(&self, device_id: &DeviceId) {
        self.record(RemediationCall::Refresh {
            device_id: device_id.clone(),
        });
    }

    async fn interface_operational_status(&self, port_id: &PortId) -> OperStatus {
        let mut script = self.lock();
        script.calls.push(RemediationCall::ReadStatus {
            port_id: port_id.clone(),
        });
        script
            .statuses
            .get_mut(port_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(OperStatus::Unknown)
    }

    async fn resolve_interface_id(
        &self,
        device_id: &DeviceId,
        interface_name: &str,
    ) -> Option<PortId> {
        let mut script = self.lock();
        script.calls.push(RemediationCall::Resolve {
            device_id: device_id.clone(),
            interface_name: interface_name.to_string(),
        });
        script.ports.get(device_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_queue_drains_to_unknown() {
        let remediation = ScriptedRemediation::new();
        remediation.push_status("7", OperStatus::Down);
        remediation.push_status("7", OperStatus::Up);
        let port = PortId::new("7");

        assert_eq!(remediation.interface_operational_status(&port).await, OperStatus::Down);
        assert_eq!(remediation.interface_operational_status(&port).await, OperStatus::Up);
        assert_eq!(
            remediation.interface_operational_status(&port).await,
            OperStatus::Unknown
        );
    }

    #[tokio::test]
    async fn test_failing_restore_and_call_log() {
        let remediation = ScriptedRemediation::new().with_port("42", "7");
        remediation.fail_restore("42");
        let id = DeviceId::new("42");

        assert_eq!(
            remediation.resolve_interface_id(&id, "port2").await,
            Some(PortId::new("7"))
        );
        assert!(remediation.restore(&id, "10.0.0.5").await.is_err());
        assert!(remediation
            .restore(&DeviceId::new("43"), "10.0.0.6")
            .await
            .is_ok());

        assert_eq!(remediation.calls().len(), 3);
        assert_eq!(remediation.calls_for(&id).len(), 2);
    }
}
