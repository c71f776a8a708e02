//! HTTP/JSON surface for the onboarding service.
//!
//! Exposes an axum [`Router`] over any [`OnboardingStore`]. Every workflow in
//! [`onboard_core::workflow`] is reachable from exactly one route; handlers
//! only translate between HTTP and the workflow signatures.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod storage;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use onboard_core::store::OnboardingStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use handlers::{documents, hr, me, registration, templates};
use mailer::{MailConfig, Mailer};
use storage::DiskStorage;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ONBOARD_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  /// Public origin used to build invitation links.
  pub base_url:         String,
  pub store_path:       PathBuf,
  pub upload_dir:       PathBuf,
  pub template_dir:     PathBuf,
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,
  pub hr_username:      String,
  pub hr_password_hash: String,
  #[serde(default)]
  pub mail:             MailConfig,
}

fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: OnboardingStore> {
  pub store:     Arc<S>,
  pub files:     Arc<DiskStorage>,
  pub templates: Arc<DiskStorage>,
  pub mailer:    Arc<Mailer>,
  pub config:    Arc<ServerConfig>,
  pub auth:      Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the onboarding API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let upload_limit = state.config.max_upload_bytes;

  Router::new()
    // Registration (public)
    .route("/api/registration",          post(registration::redeem::<S>))
    .route("/api/registration/{token}",  get(registration::inspect::<S>))
    // Employee self-service
    .route("/api/me",                    get(me::dashboard::<S>))
    .route("/api/me/onboarding",         post(me::submit::<S>))
    .route("/api/me/contact",            put(me::update_contact::<S>))
    .route("/api/me/documents",          get(me::documents::<S>))
    .route("/api/me/documents/{doc_type}", put(me::upload::<S>))
    .route("/api/me/next-step",          get(me::next_step::<S>))
    // Shared
    .route("/api/documents/{id}/file",   get(documents::file::<S>))
    .route("/api/templates/{name}",      get(templates::download::<S>))
    // HR
    .route("/api/hr/tokens",             get(hr::list_tokens::<S>).post(hr::issue_token::<S>))
    .route("/api/hr/applications",       get(hr::applications::<S>))
    .route("/api/hr/employees",          get(hr::employees::<S>))
    .route("/api/hr/employees/{id}",     get(hr::employee::<S>))
    .route("/api/hr/employees/{id}/review",    post(hr::review_application::<S>))
    .route("/api/hr/employees/{id}/documents", get(hr::employee_documents::<S>))
    .route("/api/hr/employees/{id}/documents/{doc_type}", put(hr::upload_for_employee::<S>))
    .route("/api/hr/employees/{id}/nudge",     post(hr::nudge::<S>))
    .route("/api/hr/documents/{id}/review",    post(documents::review::<S>))
    .route("/api/hr/visa",               get(hr::visa::<S>))
    .layer(DefaultBodyLimit::max(upload_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
