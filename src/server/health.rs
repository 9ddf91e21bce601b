//! Probe, feature-flag, and metrics endpoints
//!
//! - `/health` - Full health report (200 healthy/degraded, 503 unhealthy)
//! - `/ready`, `/readyz` - Readiness: should this instance receive traffic?
//! - `/live`, `/livez`, `/healthz` - Liveness: is the process alive?
//! - `/features` - Feature flag snapshot (GET) and runtime override (POST)
//! - `/metrics` - Prometheus metrics in text format

use crate::probe::{guarded, HealthOutcome};
use crate::server::features;
use crate::server::shutdown::ShutdownSignal;
use crate::server::state::AppState;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Health handler
///
/// Assembly runs on its own task under the aggregation budget; faults still
/// produce a JSON body with 503.
async fn health(State(state): State<AppState>) -> Response {
    let aggregator = state.health.clone();
    let (outcome, label) = match guarded("health", state.aggregation_timeout, async move {
        aggregator.check().await
    })
    .await
    {
        Ok(outcome) => {
            let label = outcome.status().as_str();
            (outcome, label)
        }
        Err(fault) => (state.health.fault_outcome(&fault), "fault"),
    };

    state.metrics.record_probe("health", label);
    let code = outcome.status_code();
    match outcome {
        HealthOutcome::Report(report) => {
            state
                .metrics
                .observe_dependency("database", &report.checks.database);
            (code, Json(report)).into_response()
        }
        HealthOutcome::Unavailable(notice) => (code, Json(notice)).into_response(),
    }
}

/// Readiness handler
///
/// Returns 200 OK if ready, 503 Service Unavailable if not.
async fn ready(State(state): State<AppState>) -> Response {
    let gate = state.readiness.clone();
    let report = match guarded("readiness", state.aggregation_timeout, async move {
        gate.check().await
    })
    .await
    {
        Ok(report) => report,
        Err(fault) => state.readiness.fault_report(&fault),
    };

    let label = if report.error.is_some() {
        "fault"
    } else if report.ready {
        "ready"
    } else {
        "not_ready"
    };
    state.metrics.record_probe("readiness", label);

    (report.status_code(), Json(report)).into_response()
}

/// Liveness handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn live(State(state): State<AppState>) -> Response {
    state.metrics.record_probe("liveness", "alive");
    (StatusCode::OK, Json(state.liveness.check())).into_response()
}

/// Prometheus metrics handler
///
/// Returns metrics in Prometheus text format for scraping.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    state
        .metrics
        .set_shutting_down(state.lifecycle.is_shutting_down());

    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for probe, feature, and metrics endpoints
///
/// Every request carries a read-only `FlagsHandle` in its extensions.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/readyz", get(ready))
        .route("/live", get(live))
        .route("/livez", get(live))
        .route("/healthz", get(live))
        .route(
            "/features",
            get(features::list_flags).post(features::update_flag),
        )
        .route("/metrics", get(self::metrics))
        .layer(middleware::from_fn_with_state(
            state.flags.clone(),
            features::inject_flags,
        ))
        .with_state(state)
}

/// Serve the router on an already bound listener until `shutdown` fires
///
/// In-flight requests are allowed to finish after the signal.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// Run the probe server on the specified address (HTTP, no TLS)
///
/// # Returns
/// Runs until `shutdown` fires and in-flight requests drain
pub async fn run_health_server(
    addr: SocketAddr,
    router: Router,
    shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    // Log after successful bind - server is actually listening
    info!(address = %addr, "Probe server listening (HTTP)");

    serve(listener, router, shutdown).await
}

/// Run the probe server with TLS (HTTPS)
///
/// # Returns
/// Runs until `shutdown` fires and in-flight requests drain
pub async fn run_health_server_tls(
    addr: SocketAddr,
    router: Router,
    tls_config: Arc<rustls::ServerConfig>,
    mut shutdown: ShutdownSignal,
) -> Result<(), std::io::Error> {
    use axum_server::tls_rustls::RustlsConfig;
    use axum_server::Handle;

    // Convert Arc<ServerConfig> to RustlsConfig
    let config = RustlsConfig::from_config(tls_config);

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown.wait().await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(address = %addr, "Probe server listening (HTTPS)");

    axum_server::bind_rustls(addr, config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
}
