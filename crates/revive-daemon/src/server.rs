//! Server setup and lifecycle management

use std::sync::Arc;

use revive_remediation::{
    CommandRefresher, LibreNmsClient, LibreNmsConfig, Remediation, RemediationClient,
};
use revive_state::{DeviceStateStore, JsonFileState};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::ReviveConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::intake::AlertIntake;
use crate::scheduler::{RecoveryOrchestrator, WakeSignal};

/// Revive daemon server
pub struct Server {
    config: ReviveConfig,
    store: Arc<DeviceStateStore>,
    intake: Arc<AlertIntake>,
    orchestrator: Arc<RecoveryOrchestrator>,
}

impl Server {
    /// Create a server talking to LibreNMS and the local poller.
    pub fn new(config: ReviveConfig) -> DaemonResult<Self> {
        let store = Arc::new(DeviceStateStore::open(Arc::new(JsonFileState::new(
            &config.state_file,
        ))));

        let platform = LibreNmsClient::new(LibreNmsConfig {
            base_url: config.platform.base_url.clone(),
            api_token: config.platform.api_token.clone(),
            timeout: config.platform.call_timeout,
            patch_via_method_override: config.platform.patch_via_method_override,
        })?;
        let refresher =
            CommandRefresher::from_command_line(&config.refresh.command, config.refresh.timeout)?;
        let remediation = Arc::new(RemediationClient::new(platform, Arc::new(refresher)));

        Ok(Self::with_remediation(config, store, remediation))
    }

    /// Create a server over an existing store and remediation backend.
    pub fn with_remediation(
        config: ReviveConfig,
        store: Arc<DeviceStateStore>,
        remediation: Arc<dyn Remediation>,
    ) -> Self {
        let wake = Arc::new(WakeSignal::new());

        let intake = Arc::new(AlertIntake::new(
            store.clone(),
            remediation.clone(),
            wake.clone(),
            config.recovery.target_interface.clone(),
            config.recovery.unsupervised_address.clone(),
        ));

        let orchestrator = RecoveryOrchestrator::new(
            config.recovery.clone(),
            store.clone(),
            remediation,
            wake,
        );

        Self {
            config,
            store,
            intake,
            orchestrator,
        }
    }

    /// Run the server
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(
            self.intake.clone(),
            self.store.clone(),
            self.orchestrator.clone(),
        );
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            listen = %addr,
            state_file = %self.config.state_file.display(),
            tracked = self.store.len().await,
            "Revive daemon listening for LibreNMS alerts"
        );

        // Start recovery loop in background
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let recovery = tokio::spawn(self.orchestrator.clone().run(shutdown_rx));

        // Run server with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("Revive daemon shutting down");

        // Stop recovery loop; an in-flight pass runs to completion
        let _ = shutdown_tx.send(true);
        if let Err(e) = recovery.await {
            tracing::error!(error = %e, "Recovery loop task failed");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
