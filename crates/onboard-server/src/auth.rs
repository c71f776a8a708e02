//! HTTP Basic-auth extractor resolving the caller to an [`Actor`].
//!
//! The HR account is configured statically; every other username is looked
//! up among registered persons and checked against their argon2 hash.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use onboard_core::{actor::Actor, store::OnboardingStore};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The configured HR credentials.
#[derive(Clone)]
pub struct AuthConfig {
  pub hr_username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub hr_password_hash: String,
}

/// The authenticated caller of a protected route.
pub struct Caller(pub Actor);

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Hash(e.to_string()))
}

fn password_matches(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Split a `Basic` authorization header into username and password.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Verify the request's credentials and resolve the acting role.
pub async fn authenticate<S>(headers: &HeaderMap, state: &AppState<S>) -> Result<Actor, ApiError>
where
  S: OnboardingStore,
{
  let (username, password) = basic_credentials(headers)?;

  if username == state.auth.hr_username {
    return if password_matches(&password, &state.auth.hr_password_hash) {
      Ok(Actor::Hr { username })
    } else {
      Err(ApiError::Unauthorized)
    };
  }

  let person = state
    .store
    .find_person_by_username(&username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  if !password_matches(&password, &person.password_hash) {
    return Err(ApiError::Unauthorized);
  }
  Ok(Actor::Employee { person_id: person.person_id, username: person.username })
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: OnboardingStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let actor = authenticate(&parts.headers, state).await?;
    tracing::debug!(user = actor.username(), hr = actor.is_hr(), "authenticated");
    Ok(Caller(actor))
  }
}
