//! The onboarding application — the 1:1 review record that gates a person's
//! access to the rest of the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Review status of an onboarding application.
///
/// `never_submitted → pending` when the employee submits,
/// `pending → approved | rejected` when HR decides, and
/// `rejected → pending` when the employee resubmits.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  #[default]
  NeverSubmitted,
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingApplication {
  pub status:       ApplicationStatus,
  /// Reviewer feedback; always present on a rejection.
  pub feedback:     Option<String>,
  pub submitted_at: Option<DateTime<Utc>>,
  pub reviewed_at:  Option<DateTime<Utc>>,
}

impl OnboardingApplication {
  /// Whether the employee may (re)submit from the current status.
  pub fn accepts_submission(&self) -> bool {
    matches!(
      self.status,
      ApplicationStatus::NeverSubmitted | ApplicationStatus::Rejected
    )
  }

  /// Whether HR may record a decision. Approval is final; a person who never
  /// submitted has nothing to review.
  pub fn accepts_review(&self) -> bool {
    matches!(
      self.status,
      ApplicationStatus::Pending | ApplicationStatus::Rejected
    )
  }
}
