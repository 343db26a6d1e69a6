//! Interface operational status as reported by the platform

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational status of a tracked interface.
///
/// `Unknown` covers every case where no trustworthy reading exists: missing
/// field, malformed response, HTTP failure, or a call that hit its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperStatus {
    Up,
    Down,
    /// Any other value the platform reports (`lowerLayerDown`, `testing`, ...).
    Other(String),
    Unknown,
}

impl OperStatus {
    /// Interpret a raw `ifOperStatus` value. Comparison is case-insensitive.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => OperStatus::Unknown,
            Some(value) if value.eq_ignore_ascii_case("up") => OperStatus::Up,
            Some(value) if value.eq_ignore_ascii_case("down") => OperStatus::Down,
            Some(value) => OperStatus::Other(value.to_string()),
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, OperStatus::Up)
    }
}

impl fmt::Display for OperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperStatus::Up => f.write_str("up"),
            OperStatus::Down => f.write_str("down"),
            OperStatus::Other(value) => f.write_str(value),
            OperStatus::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_is_case_insensitive() {
        assert!(OperStatus::from_raw(Some("up")).is_up());
        assert!(OperStatus::from_raw(Some("UP")).is_up());
        assert!(OperStatus::from_raw(Some(" Up ")).is_up());
    }

    #[test]
    fn test_non_up_values() {
        assert_eq!(OperStatus::from_raw(Some("DOWN")), OperStatus::Down);
        assert_eq!(
            OperStatus::from_raw(Some("lowerLayerDown")),
            OperStatus::Other("lowerLayerDown".to_string())
        );
        assert_eq!(OperStatus::from_raw(None), OperStatus::Unknown);
        assert_eq!(OperStatus::from_raw(Some("  ")), OperStatus::Unknown);
        assert!(!OperStatus::Unknown.is_up());
    }
}
