//! Error types for `onboard-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::ApplicationStatus;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("invalid request: {0}")]
  Validation(String),

  #[error("unknown document type: {0:?}")]
  UnknownDocumentType(String),

  #[error("no file payload")]
  MissingFile,

  #[error("a rejection requires reviewer feedback")]
  MissingFeedback,

  #[error("{0:?} is not a valid review decision")]
  InvalidDecision(String),

  // ── Not found ───────────────────────────────────────────────────────────
  #[error("person not found: {0}")]
  PersonNotFound(Uuid),

  #[error("document not found: {0}")]
  DocumentNotFound(Uuid),

  #[error("registration token is invalid")]
  TokenNotFound,

  #[error("file not found: {0}")]
  FileNotFound(String),

  // ── Conflict ────────────────────────────────────────────────────────────
  #[error("registration token has already been used")]
  TokenUsed,

  #[error("email {0:?} is already registered")]
  EmailTaken(String),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),

  #[error("application cannot move from {from} to {to}")]
  InvalidTransition {
    from: ApplicationStatus,
    to:   ApplicationStatus,
  },

  // ── Expired ─────────────────────────────────────────────────────────────
  #[error("registration token has expired")]
  TokenExpired,

  // ── Authorization ───────────────────────────────────────────────────────
  #[error("forbidden: {0}")]
  Forbidden(String),

  // ── Dependencies ────────────────────────────────────────────────────────
  #[error("notification delivery failed: {0}")]
  Notification(String),

  #[error("file storage failed: {0}")]
  FileStorage(#[source] std::io::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// The coarse category of an [`Error`], used by transports to choose a status
/// code and by callers to tell failure modes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Expired,
  Authorization,
  TransientDependency,
  Internal,
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_)
      | Self::UnknownDocumentType(_)
      | Self::MissingFile
      | Self::MissingFeedback
      | Self::InvalidDecision(_) => ErrorKind::Validation,
      Self::PersonNotFound(_)
      | Self::DocumentNotFound(_)
      | Self::TokenNotFound
      | Self::FileNotFound(_) => ErrorKind::NotFound,
      Self::TokenUsed
      | Self::EmailTaken(_)
      | Self::UsernameTaken(_)
      | Self::InvalidTransition { .. } => ErrorKind::Conflict,
      Self::TokenExpired => ErrorKind::Expired,
      Self::Forbidden(_) => ErrorKind::Authorization,
      Self::Notification(_) | Self::FileStorage(_) => {
        ErrorKind::TransientDependency
      }
      Self::Store(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
