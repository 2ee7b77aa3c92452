//! Public instance status and Prometheus scrape endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::config::Configuration;

/// Public server status (configuration without secrets).
pub async fn status(State(config): State<Arc<Configuration>>) -> Json<Configuration> {
    Json(config.as_ref().clone())
}

/// Render collected metrics, if a recorder is installed.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use serde_json::Value;

    use crate::*;

    #[tokio::test]
    async fn test_status_handler() {
        let (state, _) = router::state();
        let app = app(state);

        let response =
            make_request(app, Method::GET, "/status.json", String::default(), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["name"], "HealthBridge");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body.get("token").is_none());
        assert!(body.get("postgres").is_none());
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (state, _) = router::state();
        let app = app(state);

        let response =
            make_request(app, Method::GET, "/metrics", String::default(), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
