//! Public registration endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/registration/{token}` | Who the invitation is for; 404 / 409 / 410 |
//! | `POST` | `/api/registration` | Body: `{"token","username","password"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use onboard_core::{
  Error,
  store::OnboardingStore,
  workflow::{self, NewAccount},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::hash_password, error::ApiError};

// ─── Inspect ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Invitation {
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub expires_at: DateTime<Utc>,
}

/// `GET /api/registration/{token}`
pub async fn inspect<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
) -> Result<Json<Invitation>, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let token = workflow::inspect_token(&*state.store, &token, Utc::now()).await?;
  Ok(Json(Invitation {
    email:      token.email,
    first_name: token.first_name,
    last_name:  token.last_name,
    expires_at: token.expires_at,
  }))
}

// ─── Redeem ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RedeemBody {
  pub token:    String,
  pub username: String,
  pub password: String,
}

/// `POST /api/registration`
pub async fn redeem<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RedeemBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let username = body.username.trim().to_owned();
  workflow::validate_credentials(&username, &body.password)?;
  // The HR login shadows any employee account of the same name.
  if username == state.auth.hr_username {
    return Err(Error::UsernameTaken(username).into());
  }

  let account = NewAccount { password_hash: hash_password(&body.password)?, username };
  let person = workflow::redeem_token(&*state.store, &body.token, account, Utc::now()).await?;
  Ok((StatusCode::CREATED, Json(person)))
}
