//! Configuration for revive-daemon
//!
//! Settings come from a `KEY=value` file (`.env` by default) overlaid by the
//! process environment. Keys are matched case-insensitively and unknown keys
//! are ignored.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::Source;

use crate::error::{DaemonError, DaemonResult};

pub const DEFAULT_CONFIG_FILE: &str = ".env";

const DEFAULT_STATE_FILE: &str = "device_state.json";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_RECOVERY_INTERVAL_SECS: u64 = 60;
const DEFAULT_TARGET_IFNAME: &str = "port2";
const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_REFRESH_COMMAND: &str = "php /opt/librenms/artisan device:poll";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Main daemon configuration
#[derive(Debug, Clone)]
pub struct ReviveConfig {
    /// LibreNMS connection
    pub platform: PlatformConfig,

    /// Recovery loop behaviour
    pub recovery: RecoveryConfig,

    /// Local status refresh command
    pub refresh: RefreshConfig,

    /// HTTP listener
    pub server: ServerConfig,

    /// Durable state location
    pub state_file: PathBuf,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Settings that were malformed and replaced by their default. Reported
    /// once logging is up.
    pub fallbacks: Vec<String>,
}

/// LibreNMS connection configuration
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// API root, e.g. `http://librenms.local/api/v0`
    pub base_url: String,

    /// Static `X-Auth-Token` credential
    pub api_token: String,

    /// Deadline for every API call
    pub call_timeout: Duration,

    /// Send PATCH as POST with `X-HTTP-Method-Override`
    pub patch_via_method_override: bool,
}

/// Recovery loop configuration
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Address used to isolate a device
    pub unsupervised_address: String,

    /// Delay between reconciliation passes
    pub interval: Duration,

    /// Interface whose status decides recovery
    pub target_interface: String,

    /// Devices processed at once within a pass
    pub max_concurrent: usize,

    /// Attempts after which each failed pass logs at error level; 0 disables
    pub escalate_after_attempts: u32,
}

/// Status refresh configuration
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Command line; the device id is appended
    pub command: String,

    /// Deadline for one run
    pub timeout: Duration,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    pub level: String,

    /// JSON format
    pub json: bool,

    /// Additional append-only log file
    pub file: Option<PathBuf>,
}

impl ReviveConfig {
    /// Load configuration from `path` (if it exists) and the environment.
    pub fn load(path: Option<&str>) -> DaemonResult<Self> {
        let path = path.unwrap_or(DEFAULT_CONFIG_FILE);

        let settings = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Ini).required(false))
            .add_source(config::Environment::default())
            .build()
            .and_then(|built| built.collect())
            .map_err(|e| DaemonError::Config(e.to_string()))?;

        let settings = settings
            .into_iter()
            .filter_map(|(key, value)| value.into_string().ok().map(|value| (key, value)))
            .collect();

        Self::from_settings(settings)
    }

    /// Build the configuration from flat key/value settings.
    pub fn from_settings(settings: HashMap<String, String>) -> DaemonResult<Self> {
        let settings = Settings::new(settings);
        let mut fallbacks = Vec::new();

        let platform = PlatformConfig {
            base_url: settings.required("LIBRENMS_URL")?,
            api_token: settings
                .get("API_TOKEN")
                .or_else(|| settings.get("LIBRENMS_API_TOKEN"))
                .ok_or_else(|| {
                    DaemonError::Config("API_TOKEN (or LIBRENMS_API_TOKEN) is required".into())
                })?,
            call_timeout: Duration::from_secs(settings.parse_or(
                "CALL_TIMEOUT_SEC",
                DEFAULT_CALL_TIMEOUT_SECS,
                &mut fallbacks,
            )),
            patch_via_method_override: settings.flag("PATCH_VIA_METHOD_OVERRIDE"),
        };

        let max_concurrent = match settings.parse_or(
            "MAX_CONCURRENT_RECOVERIES",
            DEFAULT_MAX_CONCURRENT,
            &mut fallbacks,
        ) {
            0 => {
                fallbacks.push(format!(
                    "MAX_CONCURRENT_RECOVERIES=0 replaced by {}",
                    DEFAULT_MAX_CONCURRENT
                ));
                DEFAULT_MAX_CONCURRENT
            }
            n => n,
        };

        let recovery = RecoveryConfig {
            unsupervised_address: settings.required("UNSUPERVISED_IP")?,
            interval: Duration::from_secs(settings.parse_or(
                "RECOVERY_INTERVAL_SEC",
                DEFAULT_RECOVERY_INTERVAL_SECS,
                &mut fallbacks,
            )),
            target_interface: settings
                .get("TARGET_IFNAME")
                .unwrap_or_else(|| DEFAULT_TARGET_IFNAME.to_string()),
            max_concurrent,
            escalate_after_attempts: settings.parse_or(
                "ESCALATE_AFTER_ATTEMPTS",
                0,
                &mut fallbacks,
            ),
        };

        let refresh = RefreshConfig {
            command: settings
                .get("REFRESH_COMMAND")
                .unwrap_or_else(|| DEFAULT_REFRESH_COMMAND.to_string()),
            timeout: Duration::from_secs(settings.parse_or(
                "REFRESH_TIMEOUT_SEC",
                DEFAULT_REFRESH_TIMEOUT_SECS,
                &mut fallbacks,
            )),
        };

        let listen_addr = match settings.get("LISTEN_ADDR") {
            Some(addr) => parse_listen_addr(&addr)?,
            None => {
                let port = match settings.get("HTTP_PORT") {
                    Some(port) => port.parse::<u16>().map_err(|e| {
                        DaemonError::Config(format!("Invalid HTTP_PORT {:?}: {}", port, e))
                    })?,
                    None => DEFAULT_HTTP_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let logging = LoggingConfig {
            level: settings
                .get("LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            json: settings.flag("LOG_JSON"),
            file: settings.get("LOG_FILE").map(PathBuf::from),
        };

        Ok(Self {
            platform,
            recovery,
            refresh,
            server: ServerConfig { listen_addr },
            state_file: settings
                .get("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            logging,
            fallbacks,
        })
    }
}

/// Parse a listen address given on the command line or in settings.
pub fn parse_listen_addr(addr: &str) -> DaemonResult<SocketAddr> {
    addr.trim()
        .parse()
        .map_err(|e| DaemonError::Config(format!("Invalid listen address {:?}: {}", addr, e)))
}

/// Case-insensitive view over raw settings
struct Settings(HashMap<String, String>);

impl Settings {
    fn new(raw: HashMap<String, String>) -> Self {
        Self(
            raw.into_iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
        )
    }

    /// Trimmed, unquoted, non-empty value
    fn get(&self, key: &str) -> Option<String> {
        let value = self.0.get(&key.to_lowercase())?.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value)
            .trim();

        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn required(&self, key: &str) -> DaemonResult<String> {
        self.get(key)
            .ok_or_else(|| DaemonError::Config(format!("{} is required", key)))
    }

    fn parse_or<T>(&self, key: &str, default: T, fallbacks: &mut Vec<String>) -> T
    where
        T: FromStr + std::fmt::Display,
    {
        match self.get(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                fallbacks.push(format!("{}={:?} is malformed, using {}", key, raw, default));
                default
            }),
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }
}
