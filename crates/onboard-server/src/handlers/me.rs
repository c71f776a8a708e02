//! Employee self-service endpoints under `/api/me`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/me` | Dashboard: person, gate, document slots, next step, visa |
//! | `POST` | `/api/me/onboarding` | Body: `Profile`; submit or resubmit |
//! | `PUT`  | `/api/me/contact` | Body: `ContactUpdate`; approved employees only |
//! | `GET`  | `/api/me/documents` | One slot per document type |
//! | `PUT`  | `/api/me/documents/{doc_type}` | Raw body; `?filename=` |
//! | `GET`  | `/api/me/next-step` | `NextStep` or `null` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, header},
};
use bytes::Bytes;
use chrono::Utc;
use onboard_core::{
  document::{Document, DocumentSlot, UploadedFile},
  person::{ContactUpdate, Person, Profile},
  status::NextStep,
  store::OnboardingStore,
  workflow::{self, Dashboard},
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError};

/// `GET /api/me`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
) -> Result<Json<Dashboard>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person_id = actor.require_employee()?;
  let dashboard = workflow::dashboard(&*state.store, &actor, person_id, Utc::now()).await?;
  Ok(Json(dashboard))
}

/// `POST /api/me/onboarding`
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Json(profile): Json<Profile>,
) -> Result<Json<Person>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person =
    workflow::submit_application(&*state.store, &actor, profile, Utc::now()).await?;
  Ok(Json(person))
}

/// `PUT /api/me/contact`
pub async fn update_contact<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Json(update): Json<ContactUpdate>,
) -> Result<Json<Person>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person = workflow::update_contact(&*state.store, &actor, update).await?;
  Ok(Json(person))
}

/// `GET /api/me/documents`
pub async fn documents<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
) -> Result<Json<Vec<DocumentSlot>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person_id = actor.require_employee()?;
  let slots = workflow::document_slots(&*state.store, &actor, person_id).await?;
  Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
  pub filename: Option<String>,
}

/// Wrap a raw upload body, naming it after `?filename=` or the document type.
pub(crate) fn uploaded_file(
  doc_type: &str,
  params: UploadParams,
  headers: &HeaderMap,
  body: &Bytes,
) -> UploadedFile {
  let content_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("application/octet-stream")
    .to_owned();
  let original_name = params
    .filename
    .map(|n| n.trim().to_owned())
    .filter(|n| !n.is_empty())
    .unwrap_or_else(|| doc_type.to_owned());

  UploadedFile { original_name, content_type, bytes: body.to_vec() }
}

/// `PUT /api/me/documents/{doc_type}?filename=<name>` — body is the file.
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(doc_type): Path<String>,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<Document>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person_id = actor.require_employee()?;
  let file = uploaded_file(&doc_type, params, &headers, &body);
  let document = workflow::upload_or_replace(
    &*state.store,
    &*state.files,
    &actor,
    person_id,
    &doc_type,
    file,
    Utc::now(),
  )
  .await?;
  Ok(Json(document))
}

/// `GET /api/me/next-step`
pub async fn next_step<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
) -> Result<Json<Option<NextStep>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let step = workflow::next_step(&*state.store, &actor).await?;
  Ok(Json(step))
}
