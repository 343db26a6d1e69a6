//! Per-device recovery record
//!
//! The persisted field names (`ip`, `port_id`, `added_at`) are the ones the
//! state file has always used, so files written by older deployments keep
//! loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PortId;

/// One tracked device that has not yet been confirmed recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecoveryRecord {
    /// Display name, informational only.
    pub hostname: String,

    /// Management address before isolation; restored verbatim on each attempt.
    #[serde(rename = "ip")]
    pub original_address: String,

    /// Interface whose operational status gates recovery.
    #[serde(rename = "port_id", default)]
    pub tracked_interface_id: Option<PortId>,

    /// First alert of the current episode.
    #[serde(rename = "added_at", default = "Utc::now", with = "timestamp")]
    pub registered_at: DateTime<Utc>,

    /// Bumped on every intake write for this device.
    #[serde(default)]
    pub revision: u64,

    /// Completed recovery attempts in this episode.
    #[serde(default)]
    pub attempts: u32,
}

impl DeviceRecoveryRecord {
    pub fn new(
        hostname: impl Into<String>,
        original_address: impl Into<String>,
        tracked_interface_id: Option<PortId>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            original_address: original_address.into(),
            tracked_interface_id,
            registered_at: Utc::now(),
            revision: 1,
            attempts: 0,
        }
    }
}

/// RFC 3339 on write; also accepts the naive local timestamps
/// (`2024-05-01T10:00:00.123456`) that earlier state files contain.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(de::Error::custom)
    }
}
