//! HR endpoints under `/api/hr`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/hr/tokens` | Body: `{"email","first_name","last_name"}` |
//! | `GET`  | `/api/hr/tokens` | Newest first, with derived state |
//! | `GET`  | `/api/hr/applications` | Optional `?status=` |
//! | `GET`  | `/api/hr/employees` | Optional `?search=` |
//! | `GET`  | `/api/hr/employees/{id}` | Dashboard for one employee |
//! | `POST` | `/api/hr/employees/{id}/review` | Body: `{"decision","feedback"}` |
//! | `GET`  | `/api/hr/employees/{id}/documents` | Document slots |
//! | `PUT`  | `/api/hr/employees/{id}/documents/{doc_type}` | Raw-body upload |
//! | `POST` | `/api/hr/employees/{id}/nudge` | Mail the OPT next step |
//! | `GET`  | `/api/hr/visa` | Optional `?search=`; most urgent first |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::Utc;
use onboard_core::{
  application::ApplicationStatus,
  document::{Document, DocumentSlot},
  person::Person,
  status::NextStep,
  store::{OnboardingStore, PersonQuery},
  token::{Invite, TokenView},
  workflow::{self, ApplicationSummary, Dashboard, VisaTrackingEntry},
};
use serde::Deserialize;
use uuid::Uuid;

use super::me::{UploadParams, uploaded_file};
use crate::{AppState, auth::Caller, error::ApiError};

// ─── Registration tokens ──────────────────────────────────────────────────────

/// `POST /api/hr/tokens`
pub async fn issue_token<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Json(invite): Json<Invite>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let issued = workflow::issue_token(
    &*state.store,
    &*state.mailer,
    &actor,
    invite,
    &state.config.base_url,
    Utc::now(),
  )
  .await?;
  Ok((StatusCode::CREATED, Json(issued)))
}

/// `GET /api/hr/tokens`
pub async fn list_tokens<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
) -> Result<Json<Vec<TokenView>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let tokens = workflow::list_tokens(&*state.store, &actor, Utc::now()).await?;
  Ok(Json(tokens))
}

// ─── Applications and employees ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ApplicationsParams {
  pub status: Option<ApplicationStatus>,
}

/// `GET /api/hr/applications[?status=<status>]`
pub async fn applications<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Query(params): Query<ApplicationsParams>,
) -> Result<Json<Vec<ApplicationSummary>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = PersonQuery { search: None, application_status: params.status };
  let summaries = workflow::list_applications(&*state.store, &actor, &query).await?;
  Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub search: Option<String>,
}

/// `GET /api/hr/employees[?search=<text>]`
pub async fn employees<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ApplicationSummary>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let query = PersonQuery { search: params.search, application_status: None };
  let summaries = workflow::list_applications(&*state.store, &actor, &query).await?;
  Ok(Json(summaries))
}

/// `GET /api/hr/employees/{id}`
pub async fn employee<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Dashboard>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  actor.require_hr()?;
  let dashboard = workflow::dashboard(&*state.store, &actor, id, Utc::now()).await?;
  Ok(Json(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
  pub decision: String,
  pub feedback: Option<String>,
}

/// `POST /api/hr/employees/{id}/review`
pub async fn review_application<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewBody>,
) -> Result<Json<Person>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let person = workflow::review_application(
    &*state.store,
    &actor,
    id,
    &body.decision,
    body.feedback,
    Utc::now(),
  )
  .await?;
  Ok(Json(person))
}

/// `GET /api/hr/employees/{id}/documents`
pub async fn employee_documents<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentSlot>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  actor.require_hr()?;
  let slots = workflow::document_slots(&*state.store, &actor, id).await?;
  Ok(Json(slots))
}

/// `PUT /api/hr/employees/{id}/documents/{doc_type}?filename=<name>` — HR
/// uploads on an employee's behalf; the application gate does not apply.
pub async fn upload_for_employee<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path((id, doc_type)): Path<(Uuid, String)>,
  Query(params): Query<UploadParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<Document>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  actor.require_hr()?;
  let file = uploaded_file(&doc_type, params, &headers, &body);
  let document = workflow::upload_or_replace(
    &*state.store,
    &*state.files,
    &actor,
    id,
    &doc_type,
    file,
    Utc::now(),
  )
  .await?;
  Ok(Json(document))
}

// ─── Visa tracking ────────────────────────────────────────────────────────────

/// `GET /api/hr/visa[?search=<text>]`
pub async fn visa<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<VisaTrackingEntry>>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let entries =
    workflow::visa_tracking(&*state.store, &actor, params.search, Utc::now()).await?;
  Ok(Json(entries))
}

/// `POST /api/hr/employees/{id}/nudge`
pub async fn nudge<S>(
  State(state): State<AppState<S>>,
  Caller(actor): Caller,
  Path(id): Path<Uuid>,
) -> Result<Json<NextStep>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let step = workflow::nudge(&*state.store, &*state.mailer, &actor, id).await?;
  Ok(Json(step))
}
