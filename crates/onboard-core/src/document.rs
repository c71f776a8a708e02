//! Uploaded documents and their review state.
//!
//! A person holds at most one document per [`DocumentType`]. Uploading again
//! replaces the stored file and resets the review. A type that was never
//! uploaded has no row at all; the read path reports it as
//! [`DocumentStatus::NotUploaded`] through [`DocumentSlot`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
  ProfilePicture,
  DriversLicense,
  WorkAuthorization,
  OptReceipt,
  OptEad,
  #[serde(rename = "i983")]
  #[strum(serialize = "i983")]
  I983,
  #[serde(rename = "i20")]
  #[strum(serialize = "i20")]
  I20,
}

impl DocumentType {
  /// Parse a wire value, mapping anything outside the fixed enumeration to
  /// [`Error::UnknownDocumentType`].
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownDocumentType(s.to_owned()))
  }

  /// The later OPT documents belong to the post-onboarding visa workflow and
  /// may only be uploaded once the application is approved.
  pub fn requires_clear_gate(self) -> bool {
    matches!(self, Self::OptEad | Self::I983 | Self::I20)
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
  /// Derived only; never persisted.
  NotUploaded,
  Pending,
  Approved,
  Rejected,
}

/// A reviewer's verdict on a single document.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewDecision {
  Approved,
  Rejected,
}

impl From<ReviewDecision> for DocumentStatus {
  fn from(d: ReviewDecision) -> Self {
    match d {
      ReviewDecision::Approved => Self::Approved,
      ReviewDecision::Rejected => Self::Rejected,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub document_id:   Uuid,
  pub person_id:     Uuid,
  pub doc_type:      DocumentType,
  pub status:        DocumentStatus,
  pub feedback:      Option<String>,
  /// Name under which [`crate::files::FileStorage`] holds the bytes.
  pub stored_name:   String,
  /// Client-supplied file name, kept for downloads.
  pub original_name: String,
  pub content_type:  String,
  pub uploaded_at:   DateTime<Utc>,
  pub reviewed_at:   Option<DateTime<Utc>>,
}

/// An incoming file, as received by the transport layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub original_name: String,
  pub content_type:  String,
  pub bytes:         Vec<u8>,
}

/// One document type for one person, with the stored record if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSlot {
  pub doc_type: DocumentType,
  pub status:   DocumentStatus,
  pub feedback: Option<String>,
  pub document: Option<Document>,
}

impl DocumentSlot {
  pub fn from_document(doc_type: DocumentType, document: Option<Document>) -> Self {
    match document {
      Some(d) => Self {
        doc_type,
        status: d.status,
        feedback: d.feedback.clone(),
        document: Some(d),
      },
      None => Self {
        doc_type,
        status: DocumentStatus::NotUploaded,
        feedback: None,
        document: None,
      },
    }
  }

  /// Expand a person's stored documents into one slot per [`DocumentType`],
  /// in enumeration order.
  pub fn all(mut documents: Vec<Document>) -> Vec<Self> {
    DocumentType::iter()
      .map(|ty| {
        let found = documents
          .iter()
          .position(|d| d.doc_type == ty)
          .map(|i| documents.swap_remove(i));
        Self::from_document(ty, found)
      })
      .collect()
  }
}

/// The slot for `ty` among `slots`, if present.
pub fn slot_for(slots: &[DocumentSlot], ty: DocumentType) -> Option<&DocumentSlot> {
  slots.iter().find(|s| s.doc_type == ty)
}
