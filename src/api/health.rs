//! Health check endpoint
//!
//! - GET /api/v1/health - Database liveness plus request counters

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::middleware::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub avg_response_time_us: f64,
}

/// GET /api/v1/health
///
/// Answers 503 when the database does not respond to a ping.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = match state.pool.ping().await {
        Ok(()) => ("ok", "up", StatusCode::OK),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            ("degraded", "down", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let stats = &state.request_stats;
    (
        code,
        Json(HealthResponse {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: stats.uptime_seconds(),
            total_requests: stats.total_requests(),
            avg_response_time_us: stats.avg_response_time_us(),
        }),
    )
}
