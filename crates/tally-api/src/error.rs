//! API error type and [`axum::response::IntoResponse`] implementation.

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
  /// A classified domain failure from the store.
  #[error(transparent)]
  Domain(#[from] tally_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

/// Convert a backend error into an [`ApiError`] via the domain taxonomy.
pub fn store_err<E: Into<tally_core::Error>>(e: E) -> ApiError {
  ApiError::Domain(e.into())
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Domain(e) if e.is_not_found() => StatusCode::NOT_FOUND,
      ApiError::Domain(e) if e.is_conflict() => StatusCode::CONFLICT,
      ApiError::Domain(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!(error = %self, "request failed with store error");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
