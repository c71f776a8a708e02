//! `GET /api/templates/{name}` — static forms employees download before
//! filling in their I-983.

use axum::{
  extract::{Path, State},
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use onboard_core::{Error, files::FileStorage, store::OnboardingStore};

use crate::{AppState, auth::Caller, error::ApiError};

pub async fn download<S>(
  State(state): State<AppState<S>>,
  Caller(_actor): Caller,
  Path(name): Path<String>,
) -> Result<Response, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  // Invalid names are reported as missing rather than as bad input.
  if !state.templates.exists(&name).await.unwrap_or(false) {
    return Err(Error::FileNotFound(name).into());
  }
  let bytes = state.templates.read(&name).await.map_err(Error::FileStorage)?;

  let mut res = bytes.into_response();
  let content_type = if name.to_ascii_lowercase().ends_with(".pdf") {
    "application/pdf"
  } else {
    "application/octet-stream"
  };
  res.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
  if let Ok(cd) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
    res.headers_mut().insert(header::CONTENT_DISPOSITION, cd);
  }
  Ok(res)
}
