//! Error types for the storage layer and the HTTP surface.
//!
//! `ApiError` maps onto status codes and a `{"error": "..."}` body.
//! Internal failures are logged with their detail and answered with a generic message.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
  #[error("SQLite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("Invalid enum value for {field}: {value}")]
  InvalidEnum { field: String, value: String },

  #[error("Migration failed at version {version}: {reason}")]
  MigrationFailed { version: i64, reason: String },

  #[error("Malformed JSON column {column}: {reason}")]
  MalformedJson { column: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("Authentication credentials were not provided.")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  /// Internal failure with a caller-facing message; the detail is only logged.
  #[error("{public}")]
  Internal { public: String, detail: String },
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    ApiError::BadRequest(msg.into())
  }

  pub fn forbidden(msg: impl Into<String>) -> Self {
    ApiError::Forbidden(msg.into())
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    ApiError::NotFound(msg.into())
  }

  pub fn admin_required() -> Self {
    ApiError::Forbidden("Admin access required".into())
  }

  pub fn internal(detail: impl ToString) -> Self {
    ApiError::Internal {
      public: "An internal error occurred.".into(),
      detail: detail.to_string(),
    }
  }

  /// Replace the caller-facing message of an internal error, keep everything else.
  pub fn with_public_message(self, public: &str) -> Self {
    match self {
      ApiError::Internal { detail, .. } => ApiError::Internal { public: public.into(), detail },
      other => other,
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let ApiError::Internal { detail, .. } = &self {
      tracing::error!(target: "haven_backend", %detail, "API internal error");
    }
    let status = self.status();
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
  fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<axum::extract::rejection::QueryRejection> for ApiError {
  fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<rusqlite::Error> for ApiError {
  fn from(err: rusqlite::Error) -> Self {
    ApiError::internal(err)
  }
}

impl From<DatabaseError> for ApiError {
  fn from(err: DatabaseError) -> Self {
    ApiError::internal(err)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use http_body_util::BodyExt;

  #[tokio::test]
  async fn internal_error_hides_detail() {
    let err = ApiError::internal("disk I/O error at page 7")
      .with_public_message("An error occurred while processing the assessment.");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "An error occurred while processing the assessment.");
    assert!(!String::from_utf8_lossy(&bytes).contains("disk"));
  }

  #[test]
  fn public_message_only_rewrites_internal() {
    let err = ApiError::bad_request("Invalid question ID.").with_public_message("x");
    assert_eq!(err.to_string(), "Invalid question ID.");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn database_error_maps_to_500() {
    let err: ApiError = DatabaseError::InvalidEnum { field: "RiskLevel".into(), value: "x".into() }.into();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
