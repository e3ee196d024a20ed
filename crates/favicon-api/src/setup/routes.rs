//! Route configuration

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use favicon_infra::request_id_middleware;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::liveness_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route(
            "/events/storage/finalize",
            post(handlers::events::storage_finalize),
        )
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
