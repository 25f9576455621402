//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Store failures arrive as [`leasehold_core::Error`] and are mapped onto
//! HTTP statuses by their [`ErrorKind`]. Every error body carries `error`
//! (the message), `kind` and `retryable`; conflicts add the conflicting
//! row, and batch aborts add the full report.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use leasehold_core::{Error, ErrorKind};
use serde_json::{Value, json};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Domain(#[from] Error),
}

impl ApiError {
  /// Convert a backend error through the core taxonomy.
  pub fn store<E: Into<Error>>(err: E) -> Self { Self::Domain(err.into()) }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Validation => StatusCode::BAD_REQUEST,
    ErrorKind::Reference => StatusCode::NOT_FOUND,
    ErrorKind::Conflict | ErrorKind::ConcurrentAmendment => StatusCode::CONFLICT,
    ErrorKind::BatchAborted => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

fn domain_body(err: &Error) -> Value {
  let mut body = json!({
    "error": err.to_string(),
    "kind": err.kind(),
    "retryable": err.is_retryable(),
  });
  let extra = match err {
    Error::Overlap { scope, candidate, conflicting_id, conflicting_interval } => json!({
      "scope": scope,
      "candidate": candidate,
      "conflicting_id": conflicting_id,
      "conflicting_interval": conflicting_interval,
    }),
    Error::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
    Error::ConcurrentAmendment { lease_id } => json!({ "lease_id": lease_id }),
    Error::BatchAborted(report) => json!({ "report": report }),
    _ => return body,
  };
  if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
    body.extend(extra);
  }
  body
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (
        StatusCode::NOT_FOUND,
        json!({ "error": m, "kind": ErrorKind::Reference, "retryable": false }),
      ),
      ApiError::BadRequest(m) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": m, "kind": ErrorKind::Validation, "retryable": false }),
      ),
      ApiError::Domain(e) => {
        let status = status_for(e.kind());
        if status.is_server_error() {
          tracing::error!(error = %e, "request failed");
        }
        (status, domain_body(e))
      }
    };
    (status, Json(body)).into_response()
  }
}
