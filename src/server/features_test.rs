//! Tests for feature flag endpoints and gating middleware

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::features::inject_flags;
use super::*;
use crate::flags::{FeatureFlagManager, FlagsHandle};
use crate::probe::mock::{fixed_clock, FixedSampler, StaticDependency, StaticEncryption};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn state_for(environment: &str) -> AppState {
    AppState::new(
        ShutdownCoordinator::new(),
        Collaborators {
            database: StaticDependency::connected(),
            encryption: Arc::new(StaticEncryption),
            sampler: Arc::new(FixedSampler(10)),
            clock: fixed_clock(),
        },
        Arc::new(FeatureFlagManager::new(environment)),
        create_metrics().unwrap(),
        &ProbeSettings {
            environment: environment.to_string(),
            ..ProbeSettings::default()
        },
    )
}

async fn generate_code(flags: FlagsHandle) -> Json<Value> {
    Json(json!({
        "generated": true,
        "analytics": flags.is_enabled("advanced_analytics"),
    }))
}

/// Probe router plus one route gated on `ai_code_generation`
fn app(state: &AppState) -> Router {
    let gate = FlagGate::new(
        "ai_code_generation",
        state.flags.clone(),
        state.metrics.clone(),
    );
    let ai = gated(Router::new().route("/ai/generate", get(generate_code)), gate)
        .layer(middleware::from_fn_with_state(state.flags.clone(), inject_flags));

    build_router(state.clone()).merge(ai)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post_features(body: &str) -> Request<Body> {
    Request::post("/features")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_flags_includes_environment_and_defaults() {
    let state = state_for("production");

    let (status, body) = send(
        app(&state),
        Request::get("/features").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["environment"], "production");
    assert_eq!(body["timestamp"], "2026-01-02T03:04:05.000Z");
    assert_eq!(body["features"]["ai_code_generation"], false);
    assert_eq!(body["features"]["medhelm_evaluation"], true);
    assert_eq!(body["features"].as_object().unwrap().len(), 21);
}

#[tokio::test]
async fn test_update_flag_applies_override() {
    let state = state_for("production");

    let (status, body) = send(
        app(&state),
        post_features(r#"{"flag":"ai_code_generation","value":true}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["flag"], "ai_code_generation");
    assert_eq!(body["value"], true);
    assert!(state.flags.is_enabled("ai_code_generation"));
}

/// Structured values are stored as-is and echoed back
#[tokio::test]
async fn test_update_flag_accepts_structured_value() {
    let state = state_for("development");

    let (status, body) = send(
        app(&state),
        post_features(r#"{"flag":"rollout","value":{"percent":25}}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"]["percent"], 25);
    assert!(state.flags.is_enabled("rollout"));
}

#[tokio::test]
async fn test_update_flag_rejects_missing_fields() {
    let cases = [
        r#"{"value":true}"#,
        r#"{"flag":"x"}"#,
        r#"{"flag":"","value":true}"#,
        r#"{"flag":0,"value":true}"#,
        "not json",
    ];

    for case in cases {
        let state = state_for("development");
        let (status, body) = send(app(&state), post_features(case)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert_eq!(body["error"], "Missing required fields");
        assert_eq!(body["required"], json!(["flag", "value"]));
        assert!(state.flags.get_flag("x").is_none());
    }
}

/// A present null is stored as an override that reads back as disabled
#[tokio::test]
async fn test_update_flag_accepts_null_value() {
    let state = state_for("development");
    assert!(state.flags.is_enabled("ai_code_generation"));

    let (status, body) = send(
        app(&state),
        post_features(r#"{"flag":"ai_code_generation","value":null}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["value"], Value::Null);
    assert!(!state.flags.is_enabled("ai_code_generation"));

    let (status, _) = send(
        app(&state),
        Request::get("/ai/generate").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_flag_accepts_numeric_flag_name() {
    let state = state_for("development");

    let (status, body) = send(app(&state), post_features(r#"{"flag":42,"value":true}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flag"], "42");
    assert!(state.flags.is_enabled("42"));
}

/// Disabled flag: 404 naming the flag, handler never runs
#[tokio::test]
async fn test_gated_route_404_when_flag_disabled() {
    let state = state_for("production");

    let (status, body) = send(
        app(&state),
        Request::get("/ai/generate").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Feature not available");
    assert_eq!(body["feature_flag"], "ai_code_generation");
    assert_eq!(
        body["message"],
        "The feature 'ai_code_generation' is currently disabled"
    );

    let metrics = state.metrics.encode().unwrap();
    assert!(metrics.contains(r#"vigil_feature_gate_rejections_total{flag="ai_code_generation"} 1"#));
}

#[tokio::test]
async fn test_gated_route_passes_when_flag_enabled() {
    let state = state_for("development");

    let (status, body) = send(
        app(&state),
        Request::get("/ai/generate").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated"], true);
    assert_eq!(body["analytics"], true);
}

/// An override through the admin endpoint opens the gate on the next request
#[tokio::test]
async fn test_override_opens_gate_immediately() {
    let state = state_for("production");
    let router = app(&state);

    let (status, _) = send(
        router.clone(),
        Request::get("/ai/generate").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        router.clone(),
        post_features(r#"{"flag":"ai_code_generation","value":true}"#),
    )
    .await;

    let (status, _) = send(
        router,
        Request::get("/ai/generate").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

/// Without the inject layer the extractor fails loudly instead of guessing
#[tokio::test]
async fn test_flags_handle_requires_injection() {
    let router = Router::new().route("/ai/generate", get(generate_code));

    let response = router
        .oneshot(Request::get("/ai/generate").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
