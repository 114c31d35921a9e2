//! API error type and [`axum::response::IntoResponse`] implementation.

use agenda_core::{Error as CoreError, error::ValidationErrors, store::StoreError};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  /// A concurrent write claimed the same provider and date first.
  #[error("conflict: {0}")]
  Conflict(ValidationErrors),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error by the domain error it carries, if any.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    let classified = match e.domain() {
      Some(CoreError::Validation(errors)) => Some(ApiError::Validation(errors.clone())),
      Some(conflict @ CoreError::Conflict { .. }) => Some(ApiError::Conflict(
        conflict.validation_errors().unwrap_or_default(),
      )),
      Some(
        not_found @ (CoreError::NoveltyNotFound(_) | CoreError::AppointmentNotFound(_)),
      ) => Some(ApiError::NotFound(not_found.to_string())),
      _ => None,
    };
    classified.unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Validation(fields) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "validation failed", "fields": fields })),
      )
        .into_response(),
      ApiError::Conflict(fields) => (
        StatusCode::CONFLICT,
        Json(json!({ "error": "conflicting novelty", "fields": fields })),
      )
        .into_response(),
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "the operation could not be completed" })),
        )
          .into_response()
      }
    }
  }
}
