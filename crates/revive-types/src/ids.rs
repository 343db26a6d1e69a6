//! Strongly-typed identifiers for monitored entities
//!
//! Both IDs are opaque, platform-assigned strings. LibreNMS hands them out as
//! integers in some responses and as strings in others, so construction from
//! JSON accepts either shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a device in the monitoring platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a JSON scalar. Empty strings, nulls and structured
    /// values yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        json_scalar(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a port (interface) in the monitoring platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(String);

impl PortId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        json_scalar(value).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a JSON string or number as a trimmed, non-empty string.
pub fn json_scalar(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_id_from_number_and_string() {
        assert_eq!(DeviceId::from_json(&json!(42)), Some(DeviceId::new("42")));
        assert_eq!(DeviceId::from_json(&json!("42")), Some(DeviceId::new("42")));
        assert_eq!(DeviceId::from_json(&json!(" 7 ")), Some(DeviceId::new("7")));
    }

    #[test]
    fn test_blank_and_structured_values_rejected() {
        assert_eq!(DeviceId::from_json(&json!("")), None);
        assert_eq!(DeviceId::from_json(&json!(null)), None);
        assert_eq!(PortId::from_json(&json!({"port_id": 3})), None);
        assert_eq!(PortId::from_json(&json!([1])), None);
    }

    #[test]
    fn test_transparent_serde() {
        let id = DeviceId::new("edge-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"edge-9\"");
        assert_eq!(id.to_string(), "edge-9");
    }
}
