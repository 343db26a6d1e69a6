//! Revive daemon - alert-driven device recovery for LibreNMS
//!
//! The daemon provides:
//! - A webhook that isolates devices LibreNMS reports as down
//! - A recovery loop that restores them until their tracked interface is up
//! - Durable tracking state that survives restarts

use clap::Parser;
use revive_daemon::config::{self, ReviveConfig};
use revive_daemon::error::{DaemonError, DaemonResult};
use revive_daemon::logging::init_logging;
use revive_daemon::Server;

/// Revive daemon CLI
#[derive(Parser)]
#[command(name = "revived")]
#[command(about = "Revive - isolate and restore devices LibreNMS reports as down", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file with KEY=value lines
    #[arg(short, long, env = "REVIVE_CONFIG", default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    /// Listen address; overrides LISTEN_ADDR and HTTP_PORT
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level; overrides LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = ReviveConfig::load(Some(&cli.config))?;

    // Override with CLI args
    if let Some(listen) = cli.listen.as_deref() {
        config.server.listen_addr = config::parse_listen_addr(listen)?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }

    init_logging(&config.logging).map_err(|e| DaemonError::Logging(format!("{:#}", e)))?;

    for fallback in &config.fallbacks {
        tracing::warn!(setting = %fallback, "Malformed setting replaced by default");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        librenms = %config.platform.base_url,
        unsupervised_ip = %config.recovery.unsupervised_address,
        interface = %config.recovery.target_interface,
        interval_secs = config.recovery.interval.as_secs(),
        "Starting revive daemon"
    );

    let server = Server::new(config)?;
    server.run().await
}
