//! Registration tokens — single-use, time-limited invitations issued by HR.
//!
//! Only the SHA-256 digest of a token's secret is persisted. The secret itself
//! is handed out once, at issuance, inside the invitation link.

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Every token expires this long after it was issued.
pub const TOKEN_LIFETIME: Duration = Duration::hours(3);

const SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationToken {
  pub token_id:   Uuid,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  /// Hex-encoded SHA-256 of the secret.
  #[serde(skip_serializing, default)]
  pub token_hash: String,
  pub issued_by:  String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub used_at:    Option<DateTime<Utc>>,
  pub used_by:    Option<Uuid>,
}

/// Lifecycle of a token, derived at read time. There is no expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
  Active,
  Used,
  Expired,
}

impl RegistrationToken {
  /// Build a fresh token for `invite` and return it with its secret.
  pub fn issue(invite: &Invite, issued_by: &str, now: DateTime<Utc>) -> (Self, String) {
    let secret = generate_secret();
    let token = Self {
      token_id:   Uuid::new_v4(),
      email:      normalize_email(&invite.email),
      first_name: invite.first_name.trim().to_owned(),
      last_name:  invite.last_name.trim().to_owned(),
      token_hash: hash_secret(&secret),
      issued_by:  issued_by.to_owned(),
      created_at: now,
      expires_at: now + TOKEN_LIFETIME,
      used_at:    None,
      used_by:    None,
    };
    (token, secret)
  }

  pub fn state(&self, now: DateTime<Utc>) -> TokenState {
    if self.used_at.is_some() {
      TokenState::Used
    } else if now >= self.expires_at {
      TokenState::Expired
    } else {
      TokenState::Active
    }
  }
}

/// HR's request to invite someone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
}

/// Returned once, to HR, when a token is issued.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
  pub token:            RegistrationToken,
  pub secret:           String,
  pub registration_url: String,
  /// `false` when the invitation mail could not be delivered; the token is
  /// still valid.
  pub email_sent:       bool,
}

/// A token together with its derived state, for HR listings.
#[derive(Debug, Clone, Serialize)]
pub struct TokenView {
  #[serde(flatten)]
  pub token: RegistrationToken,
  pub state: TokenState,
}

/// 32 random bytes from the OS, hex-encoded.
pub fn generate_secret() -> String {
  let mut bytes = [0u8; SECRET_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

pub fn hash_secret(secret: &str) -> String {
  hex::encode(Sha256::digest(secret.as_bytes()))
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn invite() -> Invite {
    Invite {
      email:      " New.Hire@Example.com ".into(),
      first_name: "New".into(),
      last_name:  "Hire".into(),
    }
  }

  #[test]
  fn issued_token_expires_after_three_hours() {
    let now = Utc::now();
    let (token, secret) = RegistrationToken::issue(&invite(), "hr", now);
    assert_eq!(token.expires_at - token.created_at, Duration::hours(3));
    assert_eq!(token.email, "new.hire@example.com");
    assert_eq!(token.token_hash, hash_secret(&secret));
    assert_ne!(token.token_hash, secret);
    assert_eq!(secret.len(), SECRET_BYTES * 2);
  }

  #[test]
  fn state_is_derived_from_clock() {
    let now = Utc::now();
    let (mut token, _) = RegistrationToken::issue(&invite(), "hr", now);
    assert_eq!(token.state(now), TokenState::Active);
    assert_eq!(token.state(now + Duration::hours(3)), TokenState::Expired);

    token.expires_at = now - Duration::seconds(1);
    assert_eq!(token.state(now), TokenState::Expired);

    token.used_at = Some(now - Duration::hours(1));
    assert_eq!(token.state(now), TokenState::Used);
  }

  #[test]
  fn secrets_are_unique() {
    assert_ne!(generate_secret(), generate_secret());
  }
}
