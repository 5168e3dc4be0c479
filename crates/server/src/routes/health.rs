//! Health checks for the load balancer.

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
