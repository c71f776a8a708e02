//! Document file download and HR document review.

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use onboard_core::{document::Document, store::OnboardingStore, workflow};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError};

/// `GET /api/documents/{id}/file` — the owner or HR.
pub async fn file<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let (document, bytes) =
    workflow::open_document(&*state.store, &*state.files, &actor, id).await?;

  let mut res = bytes.into_response();
  let headers = res.headers_mut();
  if let Ok(ct) = HeaderValue::from_str(&document.content_type) {
    headers.insert(header::CONTENT_TYPE, ct);
  }
  let disposition = format!(
    "inline; filename=\"{}\"",
    document.original_name.replace(['"', '\\'], "_")
  );
  if let Ok(cd) = HeaderValue::from_str(&disposition) {
    headers.insert(header::CONTENT_DISPOSITION, cd);
  }
  Ok(res)
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: String,
  pub feedback: Option<String>,
}

/// `POST /api/hr/documents/{id}/review` — body: `{"decision":"rejected","feedback":"…"}`
pub async fn review<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Document>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let document = workflow::review_document(
    &*state.store,
    &actor,
    id,
    &body.decision,
    body.feedback,
    Utc::now(),
  )
  .await?;
  Ok(Json(document))
}
