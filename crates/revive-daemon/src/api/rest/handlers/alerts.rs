//! Alert webhook handler

use axum::{body::Bytes, extract::State};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Accept a LibreNMS alert.
///
/// The body is read raw so malformed JSON is answered with our own error
/// body instead of the extractor's.
pub async fn receive_alert(State(state): State<AppState>, body: Bytes) -> ApiResult<&'static str> {
    debug!(payload = %String::from_utf8_lossy(&body), "Alert payload received");

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Alert body is not valid JSON");
        ApiError::InvalidJson(e.to_string())
    })?;

    state.intake.accept(&payload).await.map_err(|e| {
        warn!(error = %e, "Alert rejected");
        ApiError::from(e)
    })?;

    Ok("OK")
}
