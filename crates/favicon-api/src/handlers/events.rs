//! Storage finalize webhook

use std::sync::Arc;

use axum::{extract::State, Json};
use favicon_core::UploadEvent;
use favicon_services::PipelineOutcome;

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Run the favicon pipeline for one finalized object.
///
/// Ignored uploads answer 200 as well; only a failed run is an error.
pub async fn storage_finalize(
    State(state): State<Arc<AppState>>,
    ValidatedJson(event): ValidatedJson<UploadEvent>,
) -> Result<Json<PipelineOutcome>, HttpAppError> {
    tracing::debug!(bucket = %event.bucket, object = %event.object_path, "Storage finalize received");
    let outcome = state
        .pipeline
        .run(&event)
        .await
        .map_err(|failure| HttpAppError::from(failure).exposing_details(!state.is_production))?;
    Ok(Json(outcome))
}
