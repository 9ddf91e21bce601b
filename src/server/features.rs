//! Feature flag endpoints and request-gating middleware
//!
//! ## Endpoints
//! - GET /features - Snapshot of every flag for the active environment
//! - POST /features - Runtime override `{flag, value}`
//!
//! ## Middleware
//! - `inject_flags` - Attaches a read-only `FlagsHandle` to each request
//! - `require_flag` - Answers 404 for routes whose flag is disabled. 404 rather
//!   than 403 so a disabled feature is indistinguishable from a missing one.

use crate::flags::{FeatureFlagManager, FlagUpdate, FlagUpdateError, FlagsHandle};
use crate::server::metrics::SharedMetrics;
use crate::server::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// GET /features
pub async fn list_flags(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "features": state.flags.get_all_flags(),
        "environment": state.flags.environment(),
        "timestamp": state.clock.timestamp(),
    }))
}

/// POST /features
///
/// A body that is not JSON, or lacks either field, is a 400.
pub async fn update_flag(
    State(state): State<AppState>,
    payload: Result<Json<FlagUpdate>, JsonRejection>,
) -> Response {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed feature flag update");
            return missing_fields(FlagUpdateError::MissingFields);
        }
    };

    let (flag, value) = match update.validate() {
        Ok(valid) => valid,
        Err(e) => return missing_fields(e),
    };

    state.flags.set_flag(flag.clone(), value.clone());
    state.metrics.record_flag_update();

    Json(json!({
        "success": true,
        "flag": flag,
        "value": value,
        "timestamp": state.clock.timestamp(),
    }))
    .into_response()
}

fn missing_fields(error: FlagUpdateError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": error.to_string(),
            "required": ["flag", "value"],
        })),
    )
        .into_response()
}

/// Attach a read-only flags accessor to the request
pub async fn inject_flags(
    State(flags): State<Arc<FeatureFlagManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(FlagsHandle::new(flags));
    next.run(request).await
}

impl<S> FromRequestParts<S> for FlagsHandle
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<FlagsHandle>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "feature flags not injected",
        ))
    }
}

/// Flag a gated route depends on
#[derive(Clone)]
pub struct FlagGate {
    flag: Arc<str>,
    flags: Arc<FeatureFlagManager>,
    metrics: SharedMetrics,
}

impl FlagGate {
    pub fn new(flag: &str, flags: Arc<FeatureFlagManager>, metrics: SharedMetrics) -> Self {
        Self {
            flag: Arc::from(flag),
            flags,
            metrics,
        }
    }
}

/// Reject the request with 404 when the gate's flag is disabled
///
/// The check happens per request, so runtime overrides apply immediately.
pub async fn require_flag(State(gate): State<FlagGate>, request: Request, next: Next) -> Response {
    if gate.flags.is_enabled(&gate.flag) {
        return next.run(request).await;
    }

    debug!(flag = %gate.flag, path = %request.uri().path(), "Request rejected by feature gate");
    gate.metrics.record_gate_rejection(&gate.flag);

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Feature not available",
            "message": format!("The feature '{}' is currently disabled", gate.flag),
            "feature_flag": gate.flag.as_ref(),
        })),
    )
        .into_response()
}

/// Put every route of `router` behind `gate`
///
/// Uses a route layer, so paths the router does not know still fall through
/// to the normal 404.
pub fn gated<S>(router: Router<S>, gate: FlagGate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(gate, require_flag))
}
