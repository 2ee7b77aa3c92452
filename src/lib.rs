//! HealthBridge credential service: citizen self-registration and login.
#![forbid(unsafe_code)]

pub mod config;
mod crypto;
mod database;
pub mod error;
mod router;
pub mod telemetry;
mod token;
mod user;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::{
    SetSensitiveRequestHeadersLayer, SetSensitiveResponseHeadersLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::ServerError;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
    token: Option<&str>,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub credentials: user::CredentialService,
    pub token: token::TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let sensitive_headers = [header::AUTHORIZATION, header::COOKIE, header::SET_COOKIE];

    let middleware = ServiceBuilder::new()
        // Mark sensitive request headers before they are traced.
        .layer(SetSensitiveRequestHeadersLayer::new(sensitive_headers.clone()))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Mark sensitive response headers before they reach the trace.
        .layer(SetSensitiveResponseHeadersLayer::new(sensitive_headers))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /metrics` goes to `metrics`.
        .route("/metrics", get(router::status::metrics))
        .nest("/api", router::api(state.clone()))
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let mut config = config::Configuration::default();
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        config = config.path(PathBuf::from(path));
    }
    let config = config.read();

    let token = token::TokenManager::new(&config.url, &config.token)?;

    let db = database::Database::new(&config.postgres).await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let pwd = Arc::new(crypto::PasswordManager::new(&config.argon2)?);
    let repo = Arc::new(user::PgAccountRepository::new(db.postgres));
    let credentials = user::CredentialService::new(
        repo,
        pwd,
        Duration::from_secs(config.postgres.timeout),
    );

    Ok(AppState {
        config,
        credentials,
        token,
        metrics,
    })
}
