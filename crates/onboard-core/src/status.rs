//! Status derivation — pure functions over a person's classification and
//! document set. The same results drive the employee dashboard, the next-step
//! banner and HR's visa tracking view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
  application::{ApplicationStatus, OnboardingApplication},
  document::{DocumentSlot, DocumentStatus, DocumentType, slot_for},
  person::Person,
};

// ─── Onboarding gate ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateDecision {
  BlockedNeverSubmitted,
  BlockedPending,
  BlockedRejected { feedback: Option<String> },
  Clear,
}

impl GateDecision {
  pub fn is_clear(&self) -> bool { matches!(self, Self::Clear) }
}

/// Only an approved application opens the rest of the system.
pub fn onboarding_gate(application: &OnboardingApplication) -> GateDecision {
  match application.status {
    ApplicationStatus::NeverSubmitted => GateDecision::BlockedNeverSubmitted,
    ApplicationStatus::Pending => GateDecision::BlockedPending,
    ApplicationStatus::Rejected => GateDecision::BlockedRejected {
      feedback: application.feedback.clone(),
    },
    ApplicationStatus::Approved => GateDecision::Clear,
  }
}

// ─── OPT pipeline ────────────────────────────────────────────────────────────

/// One stage of the OPT document pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStep {
  pub doc_type:     DocumentType,
  /// The stage this one must be approved before.
  pub must_precede: Option<DocumentType>,
  /// Extra guidance shown when the document still has to be uploaded.
  pub hint:         Option<&'static str>,
}

/// The fixed order in which OPT employees work through their documents.
pub const OPT_PIPELINE: [PipelineStep; 4] = [
  PipelineStep {
    doc_type:     DocumentType::OptReceipt,
    must_precede: Some(DocumentType::OptEad),
    hint:         None,
  },
  PipelineStep {
    doc_type:     DocumentType::OptEad,
    must_precede: Some(DocumentType::I983),
    hint:         None,
  },
  PipelineStep {
    doc_type:     DocumentType::I983,
    must_precede: Some(DocumentType::I20),
    hint:         Some("download the I-983 templates first"),
  },
  PipelineStep {
    doc_type:     DocumentType::I20,
    must_precede: None,
    hint:         None,
  },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Info,
  Warning,
  Error,
  Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextStep {
  pub severity:    Severity,
  /// `None` once every stage is approved.
  pub doc_type:    Option<DocumentType>,
  pub instruction: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hint:        Option<&'static str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback:    Option<String>,
}

/// Report the earliest pipeline stage that is not yet approved.
///
/// Upload order is not enforced: if a later stage is further along than an
/// earlier one, the earlier stage is still the one reported.
pub fn next_opt_step(slots: &[DocumentSlot]) -> NextStep {
  for step in &OPT_PIPELINE {
    let (status, feedback) = match slot_for(slots, step.doc_type) {
      Some(slot) => (slot.status, slot.feedback.clone()),
      None => (DocumentStatus::NotUploaded, None),
    };
    let ty = step.doc_type;

    let next = match status {
      DocumentStatus::Approved => continue,
      DocumentStatus::NotUploaded => NextStep {
        severity:    Severity::Warning,
        doc_type:    Some(ty),
        instruction: format!("upload {ty}"),
        hint:        step.hint,
        feedback:    None,
      },
      DocumentStatus::Pending => NextStep {
        severity:    Severity::Info,
        doc_type:    Some(ty),
        instruction: format!("waiting for HR to approve {ty}"),
        hint:        None,
        feedback:    None,
      },
      DocumentStatus::Rejected => NextStep {
        severity:    Severity::Error,
        doc_type:    Some(ty),
        instruction: format!("re-upload {ty}"),
        hint:        step.hint,
        feedback:    Some(feedback.unwrap_or_default()),
      },
    };
    return next;
  }

  NextStep {
    severity:    Severity::Success,
    doc_type:    None,
    instruction: "all documents approved".into(),
    hint:        None,
    feedback:    None,
  }
}

/// [`next_opt_step`] for OPT employees; `None` for everyone else.
pub fn next_step_for(person: &Person, slots: &[DocumentSlot]) -> Option<NextStep> {
  person.is_opt().then(|| next_opt_step(slots))
}

// ─── Visa countdown ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisaSeverity {
  Normal,
  Warning,
  Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisaCountdown {
  pub days:     i64,
  pub severity: VisaSeverity,
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `now` until the start of `visa_end` (UTC), rounded down.
/// Negative once the visa has lapsed.
pub fn days_remaining(visa_end: NaiveDate, now: DateTime<Utc>) -> VisaCountdown {
  let end = visa_end.and_time(chrono::NaiveTime::MIN).and_utc();
  let days = (end - now).num_seconds().div_euclid(SECONDS_PER_DAY);
  VisaCountdown { days, severity: visa_severity(days) }
}

pub fn visa_severity(days: i64) -> VisaSeverity {
  match days {
    ..=30 => VisaSeverity::Critical,
    31..=90 => VisaSeverity::Warning,
    _ => VisaSeverity::Normal,
  }
}

/// Countdown for a person on a work visa; `None` when there is no end date.
pub fn visa_countdown(person: &Person, now: DateTime<Utc>) -> Option<VisaCountdown> {
  person
    .work_authorization()
    .and_then(|w| w.visa())
    .map(|v| days_remaining(v.end_date, now))
}
