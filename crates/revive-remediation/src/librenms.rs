//! HTTP client for the LibreNMS v0 REST API
//!
//! Only the four calls recovery needs are exposed. Every request carries the
//! static `X-Auth-Token` credential and is bounded by the client timeout.
//! Identifiers are appended as single percent-encoded path segments.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use revive_types::{DeviceId, OperStatus, PortId};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{RemediationError, RemediationResult};

const AUTH_HEADER: &str = "X-Auth-Token";
const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";
const OVERRIDE_FIELD: &str = "overwrite_ip";
const PORT_SEARCH_COLUMNS: &str = "port_id,device_id,ifName";

/// Connection settings for [`LibreNmsClient`].
#[derive(Debug, Clone)]
pub struct LibreNmsConfig {
    /// API root, e.g. `http://librenms.local/api/v0`.
    pub base_url: String,
    pub api_token: String,
    /// Deadline applied to every request.
    pub timeout: Duration,
    /// Send partial updates as `POST` + `X-HTTP-Method-Override: PATCH` for
    /// front proxies that only pass GET and POST.
    pub patch_via_method_override: bool,
}

/// HTTP client for the monitoring platform
pub struct LibreNmsClient {
    client: Client,
    base_url: Url,
    api_token: String,
    patch_via_method_override: bool,
}

impl LibreNmsClient {
    pub fn new(config: LibreNmsConfig) -> RemediationResult<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            RemediationError::Config(format!(
                "invalid platform base URL {:?}: {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemediationError::Config(format!(
                "platform base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemediationError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token,
            patch_via_method_override: config.patch_via_method_override,
        })
    }

    /// Point the device's management address at `address`.
    pub async fn set_override_address(
        &self,
        device_id: &DeviceId,
        address: &str,
    ) -> RemediationResult<()> {
        let body = json!({ "field": OVERRIDE_FIELD, "data": address });
        let request = self.patch(&["devices", device_id.as_str()])?.json(&body);
        self.execute("set_override_address", request).await?;
        Ok(())
    }

    /// Ask the platform to rediscover the device.
    pub async fn trigger_discovery(&self, device_id: &DeviceId) -> RemediationResult<()> {
        let request = self.request(Method::GET, &["devices", device_id.as_str(), "discover"])?;
        self.execute("trigger_discovery", request).await?;
        Ok(())
    }

    /// Read `ifOperStatus` for a port.
    pub async fn port_oper_status(&self, port_id: &PortId) -> RemediationResult<OperStatus> {
        let request = self.request(Method::GET, &["ports", port_id.as_str()])?;
        let body = self.execute_json("port_oper_status", request).await?;
        Ok(oper_status_from_body(&body))
    }

    /// Find the port named `interface_name` that belongs to `device_id`.
    pub async fn find_port(
        &self,
        device_id: &DeviceId,
        interface_name: &str,
    ) -> RemediationResult<Option<PortId>> {
        let request = self
            .request(Method::GET, &["ports", "search", "ifName", interface_name])?
            .query(&[("columns", PORT_SEARCH_COLUMNS)]);
        let body = self.execute_json("find_port", request).await?;
        Ok(port_for_device(&body, device_id))
    }

    /// Base URL with `segments` appended. Reserved characters inside a
    /// segment are escaped; empty and dot segments are refused.
    fn endpoint(&self, segments: &[&str]) -> RemediationResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| segment.is_empty() || **segment == "." || **segment == "..")
        {
            return Err(RemediationError::InvalidIdentifier((*bad).to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemediationError::Config("platform base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> RemediationResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(method = %method, url = %url, "LibreNMS request");
        Ok(self
            .client
            .request(method, url)
            .header(AUTH_HEADER, &self.api_token))
    }

    fn patch(&self, segments: &[&str]) -> RemediationResult<RequestBuilder> {
        if self.patch_via_method_override {
            Ok(self
                .request(Method::POST, segments)?
                .header(METHOD_OVERRIDE_HEADER, "PATCH"))
        } else {
            self.request(Method::PATCH, segments)
        }
    }

    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RemediationResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(operation, status = status.as_u16(), body = %body, "LibreNMS response");

        if !status.is_success() {
            return Err(RemediationError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn execute_json(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> RemediationResult<Value> {
        let body = self.execute(operation, request).await?;
        serde_json::from_str(&body).map_err(|e| RemediationError::MalformedResponse {
            operation,
            reason: e.to_string(),
        })
    }
}

/// `GET /ports/{id}` answers with `port` or `ports`, as a list or a single
/// object depending on the LibreNMS version.
fn oper_status_from_body(body: &Value) -> OperStatus {
    let entry = match body.get("port").or_else(|| body.get("ports")) {
        Some(Value::Array(items)) => items.first(),
        Some(object @ Value::Object(_)) => Some(object),
        _ => None,
    };

    OperStatus::from_raw(
        entry
            .and_then(|port| port.get("ifOperStatus"))
            .and_then(Value::as_str),
    )
}

fn port_for_device(body: &Value, device_id: &DeviceId) -> Option<PortId> {
    body.get("ports")?
        .as_array()?
        .iter()
        .filter(|port| {
            port.get("device_id")
                .and_then(DeviceId::from_json)
                .is_some_and(|owner| &owner == device_id)
        })
        .find_map(|port| port.get("port_id").and_then(PortId::from_json))
}
