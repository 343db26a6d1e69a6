//! Remediation façade used by intake and the recovery loop.
//!
//! Applies the failure policy for each side effect: isolation, rediscovery
//! and refresh are best-effort; status reads and interface lookups fall back
//! to `Unknown` / `None`; only `restore` raises.

use std::sync::Arc;

use async_trait::async_trait;
use revive_types::{DeviceId, OperStatus, PortId};
use tracing::{debug, info, instrument, warn};

use crate::error::{RemediationError, RemediationResult};
use crate::librenms::LibreNmsClient;
use crate::refresh::StatusRefresher;

/// Side effects the recovery process drives against a device.
#[async_trait]
pub trait Remediation: Send + Sync {
    /// Override the management address, then request rediscovery. Never
    /// refreshes status.
    async fn isolate(&self, device_id: &DeviceId, override_address: &str);

    /// Set the override back to the device's real address.
    async fn restore(&self, device_id: &DeviceId, original_address: &str)
        -> RemediationResult<()>;

    async fn rediscover(&self, device_id: &DeviceId);

    async fn refresh_status(&self, device_id: &DeviceId);

    async fn interface_operational_status(&self, port_id: &PortId) -> OperStatus;

    async fn resolve_interface_id(
        &self,
        device_id: &DeviceId,
        interface_name: &str,
    ) -> Option<PortId>;
}

/// Production remediation: LibreNMS over HTTP plus a local refresher.
pub struct RemediationClient {
    platform: LibreNmsClient,
    refresher: Arc<dyn StatusRefresher>,
}

impl RemediationClient {
    pub fn new(platform: LibreNmsClient, refresher: Arc<dyn StatusRefresher>) -> Self {
        Self {
            platform,
            refresher,
        }
    }
}

#[async_trait]
impl Remediation for RemediationClient {
    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn isolate(&self, device_id: &DeviceId, override_address: &str) {
        match self
            .platform
            .set_override_address(device_id, override_address)
            .await
        {
            Ok(()) => info!(address = override_address, "Isolated device"),
            Err(e) => warn!(error = %e, "Failed to set isolation address"),
        }

        self.rediscover(device_id).await;
    }

    #[instrument(skip(self), fields(device_id = %device_id))]
    async fn restore(
        &self,
        device_id: &DeviceId,
        original_address: &str,
    ) -> RemediationResult<()> {
        self.platform
            .set_override_address(device_id, original_address)
            .await
            .map_err(|e| RemediationError::RemoteCallFailed {
                operation: "restore",
                reason: e.to_string(),
            })?;

        info!(address = original_address, "Restored original address");
        Ok(())
    }

    async fn rediscover(&self, device_id: &DeviceId) {
        if let Err(e) = self.platform.trigger_discovery(device_id).await {
            warn!(device_id = %device_id, error = %e, "Rediscovery request failed");
        }
    }

    async fn refresh_status(&self, device_id: &DeviceId) {
        match self.refresher.refresh(device_id).await {
            Ok(report) if report.succeeded() => {
                debug!(
                    device_id = %device_id,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    stdout = %report.stdout,
                    "Status refresh completed"
                );
            }
            Ok(report) => {
                warn!(
                    device_id = %device_id,
                    exit_code = ?report.exit_code,
                    stdout = %report.stdout,
                    stderr = %report.stderr,
                    "Status refresh exited unsuccessfully"
                );
            }
            Err(e) => warn!(device_id = %device_id, error = %e, "Status refresh failed"),
        }
    }

    async fn interface_operational_status(&self, port_id: &PortId) -> OperStatus {
        match self.platform.port_oper_status(port_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(port_id = %port_id, error = %e, "Port status unavailable");
                OperStatus::Unknown
            }
        }
    }

    async fn resolve_interface_id(
        &self,
        device_id: &DeviceId,
        interface_name: &str,
    ) -> Option<PortId> {
        match self.platform.find_port(device_id, interface_name).await {
            Ok(Some(port_id)) => Some(port_id),
            Ok(None) => {
                debug!(device_id = %device_id, interface_name, "No matching interface");
                None
            }
            Err(e) => {
                warn!(device_id = %device_id, interface_name, error = %e, "Interface lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::librenms::LibreNmsConfig;
    use crate::refresh::RefreshReport;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingRefresher {
        refreshed: Mutex<Vec<DeviceId>>,
    }

    #[async_trait]
    impl StatusRefresher for RecordingRefresher {
        async fn refresh(&self, device_id: &DeviceId) -> RemediationResult<RefreshReport> {
            self.refreshed.lock().unwrap().push(device_id.clone());
            Ok(RefreshReport {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
                elapsed: Duration::ZERO,
            })
        }
    }

    fn client(server: &MockServer, refresher: Arc<RecordingRefresher>) -> RemediationClient {
        let platform = LibreNmsClient::new(LibreNmsConfig {
            base_url: format!("{}/api/v0", server.uri()),
            api_token: "secret".to_string(),
            timeout: Duration::from_millis(300),
            patch_via_method_override: false,
        })
        .unwrap();
        RemediationClient::new(platform, refresher)
    }

    #[tokio::test]
    async fn test_isolate_patches_and_rediscovers_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/v0/devices/42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v0/devices/42/discover"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = Arc::new(RecordingRefresher::default());
        let remediation = client(&server, refresher.clone());
        remediation
            .isolate(&DeviceId::new("42"), "127.0.0.50")
            .await;

        assert!(refresher.refreshed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_isolate_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v0/devices/42/discover"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let remediation = client(&server, Arc::new(RecordingRefresher::default()));
        remediation
            .isolate(&DeviceId::new("42"), "127.0.0.50")
            .await;
    }

    #[tokio::test]
    async fn test_restore_failure_raises() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let remediation = client(&server, Arc::new(RecordingRefresher::default()));
        let err = remediation
            .restore(&DeviceId::new("42"), "10.0.0.5")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RemediationError::RemoteCallFailed {
                operation: "restore",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_status_falls_back_to_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/ports/5"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v0/ports/6"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"port": [{"ifOperStatus": "up"}]}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let remediation = client(&server, Arc::new(RecordingRefresher::default()));
        assert_eq!(
            remediation
                .interface_operational_status(&PortId::new("5"))
                .await,
            OperStatus::Unknown
        );
        assert_eq!(
            remediation
                .interface_operational_status(&PortId::new("6"))
                .await,
            OperStatus::Unknown
        );
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/ports/search/ifName/port2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let remediation = client(&server, Arc::new(RecordingRefresher::default()));
        assert_eq!(
            remediation
                .resolve_interface_id(&DeviceId::new("42"), "port2")
                .await,
            None
        );
    }

    #[tokio::test]
    async fn test_refresh_status_delegates() {
        let server = MockServer::start().await;
        let refresher = Arc::new(RecordingRefresher::default());
        let remediation = client(&server, refresher.clone());

        remediation.refresh_status(&DeviceId::new("42")).await;

        assert_eq!(
            *refresher.refreshed.lock().unwrap(),
            vec![DeviceId::new("42")]
        );
    }
}
