//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use charter_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// 401 for a route that requires an identity the request does not carry.
  pub fn unauthorized() -> Self {
    Self::Unauthorized("authentication required".into())
  }
}

/// Map domain errors to HTTP statuses: denials are 403, missing rows 404,
/// identifier collisions and validation failures 400, backend faults 500.
impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self {
    match err {
      CoreError::Unauthenticated => ApiError::unauthorized(),
      CoreError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
      CoreError::PolicyNotFound(_)
      | CoreError::BylawNotFound(_)
      | CoreError::SuggestionNotFound(_)
      | CoreError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
      CoreError::DuplicatePolicyId(_)
      | CoreError::DuplicateBylawNumber(_)
      | CoreError::DuplicateEmail(_)
      | CoreError::AlreadyApproved(_)
      | CoreError::SuggestionTargetMissing => ApiError::BadRequest(err.to_string()),
      CoreError::Backend(_) => ApiError::Store(Box::new(err)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
