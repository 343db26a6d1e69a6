//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Alert webhook; LibreNMS transports are configured with either path
        .route("/", post(handlers::receive_alert))
        .route("/alerts", post(handlers::receive_alert))
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::recovery_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecoveryConfig;
    use crate::intake::AlertIntake;
    use crate::scheduler::{RecoveryOrchestrator, WakeSignal};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use revive_remediation::testing::ScriptedRemediation;
    use revive_state::{DeviceStateStore, InMemoryState};
    use revive_types::DeviceId;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(DeviceStateStore::open(Arc::new(InMemoryState::new())));
        let remediation = Arc::new(ScriptedRemediation::new().with_port("42", "7"));
        let wake = Arc::new(WakeSignal::new());
        let intake = Arc::new(AlertIntake::new(
            store.clone(),
            remediation.clone(),
            wake.clone(),
            "port2",
            "127.0.0.50",
        ));
        let orchestrator = RecoveryOrchestrator::new(
            RecoveryConfig {
                unsupervised_address: "127.0.0.50".to_string(),
                interval: Duration::from_secs(60),
                target_interface: "port2".to_string(),
                max_concurrent: 8,
                escalate_after_attempts: 0,
            },
            store.clone(),
            remediation,
            wake,
        );
        AppState::new(intake, store, orchestrator)
    }

    fn post_alert(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_alert_is_accepted_on_both_paths() {
        let state = test_state();
        let app = create_router(state.clone());

        let resp = app
            .clone()
            .oneshot(post_alert(
                "/",
                r#"{"device_id":"42","host":"edge-1","ip":"10.0.0.5"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");

        let resp = app
            .oneshot(post_alert(
                "/alerts",
                r#"{"device":{"device_id":43,"hostname":"edge-2","ip":"10.0.0.6"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(state.store.len().await, 2);
        let record = state.store.get(&DeviceId::new("42")).await.unwrap();
        assert_eq!(record.original_address, "10.0.0.5");
    }

    #[tokio::test]
    async fn test_missing_ip_is_rejected_without_mutation() {
        let state = test_state();
        let app = create_router(state.clone());

        let resp = app
            .oneshot(post_alert("/", r#"{"device_id":"42","host":"edge-1"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "MISSING_FIELDS");
        assert_eq!(body.as_object().unwrap().len(), 2);
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_json_is_rejected() {
        let state = test_state();
        let app = create_router(state.clone());

        let resp = app.oneshot(post_alert("/", "{not json")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["code"], "INVALID_JSON");
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_other_methods_are_not_allowed() {
        let app = create_router(test_state());

        let resp = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/alerts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_status_lists_tracked_devices() {
        let state = test_state();
        let app = create_router(state.clone());

        app.clone()
            .oneshot(post_alert(
                "/",
                r#"{"device_id":"42","host":"edge-1","ip":"10.0.0.5"}"#,
            ))
            .await
            .unwrap();

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["tracked"], 1);
        assert_eq!(body["devices"]["42"]["ip"], "10.0.0.5");
        assert_eq!(body["devices"]["42"]["port_id"], "7");
        assert!(body["last_pass"].is_null());

        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "healthy");
    }
}
