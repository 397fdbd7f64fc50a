//! Health check endpoint for load balancers and monitoring.
//!
//! Returns 200 OK when the backing store answers or is simply not configured
//! (the default-token fallback still works without it), 503 Service
//! Unavailable when a configured store is unreachable.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    challenge: bool,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = match &state.store {
        None => "unconfigured",
        Some(store) => match store.health_check().await {
            Ok(true) => "ok",
            Ok(false) => "unreachable",
            Err(e) => {
                tracing::warn!("store health check failed: {}", e);
                "unreachable"
            }
        },
    };

    let healthy = store != "unreachable";

    let response = HealthResponse {
        status: if healthy { "ok" } else { "unhealthy" },
        store,
        challenge: state.challenge.is_some(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
