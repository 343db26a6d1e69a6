//! Out-of-band status refresh
//!
//! LibreNMS only updates port state when it polls. After restoring a
//! device's address we run the local poller for that device so the next
//! status read reflects reality instead of the isolated period.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use revive_types::DeviceId;
use tokio::process::Command;

use crate::error::{RemediationError, RemediationResult};

/// What a refresh run produced. Kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl RefreshReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for triggering a platform re-poll of one device.
#[async_trait]
pub trait StatusRefresher: Send + Sync {
    async fn refresh(&self, device_id: &DeviceId) -> RemediationResult<RefreshReport>;
}

/// Runs a local executable with the device id appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRefresher {
    /// Parse a whitespace-separated command line such as
    /// `php /opt/librenms/artisan device:poll`.
    pub fn from_command_line(command_line: &str, timeout: Duration) -> RemediationResult<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| RemediationError::InvalidCommand("empty command line".into()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl StatusRefresher for CommandRefresher {
    async fn refresh(&self, device_id: &DeviceId) -> RemediationResult<RefreshReport> {
        let started = Instant::now();

        // kill_on_drop reaps the child when the deadline drops the future.
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(device_id.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| RemediationError::Timeout {
                operation: "refresh_status",
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        Ok(RefreshReport {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let refresher = CommandRefresher::from_command_line(
            "  php /opt/librenms/artisan   device:poll ",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(refresher.program(), "php");
        assert_eq!(refresher.args, vec!["/opt/librenms/artisan", "device:poll"]);
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = CommandRefresher::from_command_line("   ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RemediationError::InvalidCommand(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_device_id_is_last_argument() {
        let refresher =
            CommandRefresher::from_command_line("echo polling", Duration::from_secs(5)).unwrap();
        let report = refresher.refresh(&DeviceId::new("42")).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(report.stdout, "polling 42");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let refresher =
            CommandRefresher::from_command_line("false", Duration::from_secs(5)).unwrap();
        let report = refresher.refresh(&DeviceId::new("42")).await.unwrap();
        assert!(!report.succeeded());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_command_times_out() {
        let refresher =
            CommandRefresher::from_command_line("sleep 30", Duration::from_millis(100)).unwrap();
        let err = refresher.refresh(&DeviceId::new("1")).await.unwrap_err();
        assert!(matches!(
            err,
            RemediationError::Timeout {
                operation: "refresh_status",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_executable_is_command_error() {
        let refresher = CommandRefresher::from_command_line(
            "/nonexistent/revive-poller",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = refresher.refresh(&DeviceId::new("1")).await.unwrap_err();
        assert!(matches!(err, RemediationError::Command(_)));
    }
}
