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
  #[error("not authenticated")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<obra_core::Error> for ApiError {
  fn from(err: obra_core::Error) -> Self {
    use obra_core::Error as E;
    match err {
      E::NotAuthenticated => ApiError::Unauthorized,
      E::StoreUnavailable(e) => ApiError::Unavailable(e),
      e @ (E::UnknownRecordType(_)
      | E::InvalidRecordCode(_)
      | E::InvalidPayload(_)
      | E::SelfRelationship(_)) => ApiError::BadRequest(e.to_string()),
      e @ (E::AlreadySubmitted(_) | E::AlreadyRelated(..)) => {
        ApiError::Conflict(e.to_string())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(e) => {
        tracing::error!(error = %e, "store unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use obra_core::record::{RecordRef, RecordType};

  use super::*;

  #[test]
  fn core_errors_keep_distinct_statuses() {
    let doc = RecordRef::new(RecordType::Document, "D1");
    let cases = [
      (obra_core::Error::NotAuthenticated, StatusCode::UNAUTHORIZED),
      (
        obra_core::Error::store(std::io::Error::other("disk gone")),
        StatusCode::SERVICE_UNAVAILABLE,
      ),
      (obra_core::Error::SelfRelationship(doc.clone()), StatusCode::BAD_REQUEST),
      (
        obra_core::Error::AlreadyRelated(doc.clone(), doc.clone()),
        StatusCode::CONFLICT,
      ),
      (obra_core::Error::AlreadySubmitted(doc), StatusCode::CONFLICT),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
