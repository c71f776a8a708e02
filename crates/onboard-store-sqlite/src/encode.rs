//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings,
//! enumerations their wire values, and the profile compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use onboard_core::{
  application::{ApplicationStatus, OnboardingApplication},
  document::{Document, DocumentStatus, DocumentType},
  person::{Person, Profile},
  token::RegistrationToken,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enumerations ────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(column: &'static str, value: &str) -> Result<T> {
  T::from_str(value).map_err(|_| Error::Decode {
    column,
    value: value.to_owned(),
  })
}

// ─── Profile ─────────────────────────────────────────────────────────────────

pub fn encode_profile(p: &Profile) -> Result<String> {
  Ok(serde_json::to_string(p)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "person_id, username, email, password_hash, \
  created_at, invited_first_name, invited_last_name, profile_json, \
  application_status, application_feedback, submitted_at, reviewed_at";

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub person_id:            String,
  pub username:             String,
  pub email:                String,
  pub password_hash:        String,
  pub created_at:           String,
  pub invited_first_name:   String,
  pub invited_last_name:    String,
  pub profile_json:         Option<String>,
  pub application_status:   String,
  pub application_feedback: Option<String>,
  pub submitted_at:         Option<String>,
  pub reviewed_at:          Option<String>,
}

impl RawPerson {
  /// Read a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:            row.get(0)?,
      username:             row.get(1)?,
      email:                row.get(2)?,
      password_hash:        row.get(3)?,
      created_at:           row.get(4)?,
      invited_first_name:   row.get(5)?,
      invited_last_name:    row.get(6)?,
      profile_json:         row.get(7)?,
      application_status:   row.get(8)?,
      application_feedback: row.get(9)?,
      submitted_at:         row.get(10)?,
      reviewed_at:          row.get(11)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let profile = self
      .profile_json
      .as_deref()
      .map(serde_json::from_str::<Profile>)
      .transpose()?;

    Ok(Person {
      person_id: decode_uuid(&self.person_id)?,
      username: self.username,
      email: self.email,
      password_hash: self.password_hash,
      created_at: decode_dt(&self.created_at)?,
      invited_first_name: self.invited_first_name,
      invited_last_name: self.invited_last_name,
      profile,
      application: OnboardingApplication {
        status:       decode_enum::<ApplicationStatus>(
          "application_status",
          &self.application_status,
        )?,
        feedback:     self.application_feedback,
        submitted_at: decode_opt_dt(self.submitted_at)?,
        reviewed_at:  decode_opt_dt(self.reviewed_at)?,
      },
    })
  }
}

pub const DOCUMENT_COLUMNS: &str = "document_id, person_id, doc_type, status, \
  feedback, stored_name, original_name, content_type, uploaded_at, reviewed_at";

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:   String,
  pub person_id:     String,
  pub doc_type:      String,
  pub status:        String,
  pub feedback:      Option<String>,
  pub stored_name:   String,
  pub original_name: String,
  pub content_type:  String,
  pub uploaded_at:   String,
  pub reviewed_at:   Option<String>,
}

impl RawDocument {
  /// Read a row selected with [`DOCUMENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:   row.get(0)?,
      person_id:     row.get(1)?,
      doc_type:      row.get(2)?,
      status:        row.get(3)?,
      feedback:      row.get(4)?,
      stored_name:   row.get(5)?,
      original_name: row.get(6)?,
      content_type:  row.get(7)?,
      uploaded_at:   row.get(8)?,
      reviewed_at:   row.get(9)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:   decode_uuid(&self.document_id)?,
      person_id:     decode_uuid(&self.person_id)?,
      doc_type:      decode_enum::<DocumentType>("doc_type", &self.doc_type)?,
      status:        decode_enum::<DocumentStatus>("status", &self.status)?,
      feedback:      self.feedback,
      stored_name:   self.stored_name,
      original_name: self.original_name,
      content_type:  self.content_type,
      uploaded_at:   decode_dt(&self.uploaded_at)?,
      reviewed_at:   decode_opt_dt(self.reviewed_at)?,
    })
  }
}

pub const TOKEN_COLUMNS: &str = "token_id, email, first_name, last_name, \
  token_hash, issued_by, created_at, expires_at, used_at, used_by";

/// Raw strings read directly from a `registration_tokens` row.
pub struct RawToken {
  pub token_id:   String,
  pub email:      String,
  pub first_name: String,
  pub last_name:  String,
  pub token_hash: String,
  pub issued_by:  String,
  pub created_at: String,
  pub expires_at: String,
  pub used_at:    Option<String>,
  pub used_by:    Option<String>,
}

impl RawToken {
  /// Read a row selected with [`TOKEN_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_id:   row.get(0)?,
      email:      row.get(1)?,
      first_name: row.get(2)?,
      last_name:  row.get(3)?,
      token_hash: row.get(4)?,
      issued_by:  row.get(5)?,
      created_at: row.get(6)?,
      expires_at: row.get(7)?,
      used_at:    row.get(8)?,
      used_by:    row.get(9)?,
    })
  }

  pub fn into_token(self) -> Result<RegistrationToken> {
    Ok(RegistrationToken {
      token_id:   decode_uuid(&self.token_id)?,
      email:      self.email,
      first_name: self.first_name,
      last_name:  self.last_name,
      token_hash: self.token_hash,
      issued_by:  self.issued_by,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
      used_at:    decode_opt_dt(self.used_at)?,
      used_by:    self.used_by.as_deref().map(decode_uuid).transpose()?,
    })
  }
}
