//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (credentials present, ledger readable)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 503 until the WhatsApp credentials are configured.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_credentials(&state) && check_ledger_health(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
///
/// Full health status with component details.
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let whatsapp_ok = check_credentials(&state);
    let ledger_ok = check_ledger_health(&state).await;

    let overall_status = if whatsapp_ok && ledger_ok {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        whatsapp: if whatsapp_ok { "ok" } else { "missing" }.to_string(),
        ledger: if ledger_ok { "ok" } else { "error" }.to_string(),
        batch_running: state.batch.is_running(),
        ws_connections: state.hub.connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn check_credentials(state: &AppState) -> bool {
    state.config.validate().is_ok()
}

/// The ledger is healthy when its backing directory still exists
async fn check_ledger_health(state: &AppState) -> bool {
    match state.ledger.path().and_then(|p| p.parent()) {
        Some(dir) if !dir.as_os_str().is_empty() => tokio::fs::metadata(dir).await.is_ok(),
        _ => true,
    }
}
