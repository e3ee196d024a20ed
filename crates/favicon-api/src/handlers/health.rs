//! Health check handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::state::AppState;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness check: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Readiness check: the database is reachable.
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut response = serde_json::json!({
        "status": "ready",
        "database": "unknown",
        "storage": state.storage.backend_type().to_string(),
    });

    let mut overall_ready = true;
    match &state.pool {
        Some(pool) => {
            match tokio::time::timeout(TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await {
                Ok(Ok(_)) => response["database"] = serde_json::json!("ready"),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Database readiness check failed");
                    response["database"] = serde_json::json!(format!("not_ready: {}", e));
                    overall_ready = false;
                }
                Err(_) => {
                    tracing::error!("Database readiness check timed out");
                    response["database"] = serde_json::json!("timeout");
                    overall_ready = false;
                }
            }
        }
        None => response["database"] = serde_json::json!("not_configured"),
    }

    let status_code = if overall_ready {
        StatusCode::OK
    } else {
        response["status"] = serde_json::json!("not_ready");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
