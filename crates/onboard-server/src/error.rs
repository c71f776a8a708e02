//! API error type and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use onboard_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Core(#[from] onboard_core::Error),

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthorized => ErrorKind::Authorization,
      Self::Core(e) => e.kind(),
      Self::Hash(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }

  fn status(&self) -> StatusCode {
    if matches!(self, Self::Unauthorized) {
      return StatusCode::UNAUTHORIZED;
    }
    match self.kind() {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::Expired => StatusCode::GONE,
      ErrorKind::Authorization => StatusCode::FORBIDDEN,
      ErrorKind::TransientDependency => StatusCode::BAD_GATEWAY,
      ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
    let mut res = (status, body).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"onboard\""),
      );
    }
    res
  }
}
