//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. A failed pipeline run always
//! answers 500 so the storage notification is redelivered; other errors use
//! the status from [`ErrorMetadata`]. Error details reach the body only when
//! the handler opts in with [`HttpAppError::exposing_details`].

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use favicon_core::{AppError, ErrorMetadata, LogLevel};
use favicon_infra::ErrorResponse;
use favicon_services::{PipelineFailure, PipelineStage};
use serde::de::DeserializeOwned;

/// Wrapper so `IntoResponse` can be implemented for errors from other crates.
#[derive(Debug)]
pub struct HttpAppError {
    pub error: AppError,
    pub stage: Option<PipelineStage>,
    pub expose_details: bool,
}

impl HttpAppError {
    /// Include the error's source chain in the body unless it is sensitive.
    pub fn exposing_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }
}

impl From<AppError> for HttpAppError {
    fn from(error: AppError) -> Self {
        HttpAppError {
            error,
            stage: None,
            expose_details: false,
        }
    }
}

impl From<PipelineFailure> for HttpAppError {
    fn from(failure: PipelineFailure) -> Self {
        HttpAppError {
            error: failure.source,
            stage: Some(failure.stage),
            expose_details: false,
        }
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(format!("Invalid request body: {}", rejection.body_text())).into()
    }
}

/// `Json<T>` that rejects with our error body instead of axum's plain text.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError, stage: Option<PipelineStage>) {
    let error_type = error.error_code();
    let stage = stage.map(PipelineStage::as_str);
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, error_type, stage, "Request failed"),
        LogLevel::Warn => tracing::warn!(error = %error, error_type, stage, "Request failed"),
        LogLevel::Error => tracing::error!(error = %error, error_type, stage, "Request failed"),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = &self.error;

        let status = if self.stage.is_some() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::from_u16(error.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        };

        log_error(error, self.stage);

        let mut body = ErrorResponse::new(error.client_message()).with_type(error.error_code());
        if self.expose_details && !error.is_sensitive() {
            body.details = Some(error.detailed_message());
        }
        if let Some(stage) = self.stage {
            body = body.with_stage(stage.as_str());
        }

        (status, Json(body)).into_response()
    }
}
