//! Person — an employee account plus the profile captured during onboarding.
//!
//! Legal fields (names, date of birth, SSN, gender) are written by the
//! onboarding submission and are immutable once the application is approved.
//! Contact fields stay editable through [`ContactUpdate`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, application::OnboardingApplication};

// ─── Work authorization ──────────────────────────────────────────────────────

/// Sub-classification of a work visa. The wire values are fixed.
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
pub enum VisaKind {
  #[serde(rename = "H1-B")]
  #[strum(serialize = "H1-B")]
  H1b,
  #[serde(rename = "L2")]
  #[strum(serialize = "L2")]
  L2,
  #[serde(rename = "F1(CPT/OPT)")]
  #[strum(serialize = "F1(CPT/OPT)")]
  F1CptOpt,
  #[serde(rename = "H4")]
  #[strum(serialize = "H4")]
  H4,
  #[serde(rename = "Other")]
  #[strum(serialize = "Other")]
  Other,
}

/// Validity of a work visa. `title` names the visa when `kind` is
/// [`VisaKind::Other`] and must be absent otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisaStatus {
  pub kind:       VisaKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:      Option<String>,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum WorkAuthorization {
  Citizen,
  PermanentResident,
  WorkVisa(VisaStatus),
}

impl WorkAuthorization {
  pub fn visa(&self) -> Option<&VisaStatus> {
    match self {
      Self::WorkVisa(v) => Some(v),
      _ => None,
    }
  }

  /// `true` for F1 students on the OPT document pipeline.
  pub fn is_opt(&self) -> bool {
    self.visa().is_some_and(|v| v.kind == VisaKind::F1CptOpt)
  }

  pub fn validate(&self) -> Result<()> {
    let Some(visa) = self.visa() else { return Ok(()) };

    if visa.start_date >= visa.end_date {
      return Err(Error::Validation(
        "visa start date must precede its end date".into(),
      ));
    }
    let has_title = visa.title.as_deref().is_some_and(|t| !t.trim().is_empty());
    match (visa.kind, has_title) {
      (VisaKind::Other, false) => Err(Error::Validation(
        "a visa title is required for visa kind Other".into(),
      )),
      (VisaKind::Other, true) => Ok(()),
      (_, true) => Err(Error::Validation(
        "a visa title is only accepted for visa kind Other".into(),
      )),
      (_, false) => Ok(()),
    }
  }
}

// ─── Profile sub-types ───────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
  Male,
  Female,
  #[default]
  Undisclosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub street:   String,
  pub building: Option<String>,
  pub city:     String,
  pub state:    String,
  pub zip:      String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
  pub name:         String,
  pub phone:        String,
  pub email:        Option<String>,
  pub relationship: String,
}

/// Someone who referred the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
  pub name:         String,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub relationship: String,
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  // ── Legal ───────────────────────────────────────────────────────────────
  pub first_name:         String,
  pub last_name:          String,
  pub middle_name:        Option<String>,
  pub preferred_name:     Option<String>,
  pub date_of_birth:      NaiveDate,
  pub ssn:                String,
  pub gender:             Gender,

  // ── Contact ─────────────────────────────────────────────────────────────
  pub address:            Address,
  pub cell_phone:         String,
  pub work_phone:         Option<String>,
  pub emergency_contacts: Vec<EmergencyContact>,
  pub reference:          Option<Reference>,

  pub work_authorization: WorkAuthorization,
}

impl Profile {
  pub fn validate(&self) -> Result<()> {
    require("first name", &self.first_name)?;
    require("last name", &self.last_name)?;
    require("cell phone", &self.cell_phone)?;
    require("street", &self.address.street)?;
    require("city", &self.address.city)?;
    require("state", &self.address.state)?;
    require("zip", &self.address.zip)?;

    let digits: String = self.ssn.chars().filter(|c| *c != '-').collect();
    if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::Validation("SSN must be nine digits".into()));
    }

    if self.emergency_contacts.is_empty() {
      return Err(Error::Validation(
        "at least one emergency contact is required".into(),
      ));
    }
    for contact in &self.emergency_contacts {
      require("emergency contact name", &contact.name)?;
      require("emergency contact phone", &contact.phone)?;
    }

    self.work_authorization.validate()
  }

  /// Display name: preferred name if set, else first name, plus last name.
  pub fn display_name(&self) -> String {
    let first = self
      .preferred_name
      .as_deref()
      .filter(|n| !n.trim().is_empty())
      .unwrap_or(&self.first_name);
    format!("{first} {}", self.last_name)
  }

  /// Overwrite the mutable contact fields, leaving legal fields untouched.
  pub fn apply_contact(&mut self, update: ContactUpdate) {
    self.preferred_name = update.preferred_name;
    self.address = update.address;
    self.cell_phone = update.cell_phone;
    self.work_phone = update.work_phone;
    self.emergency_contacts = update.emergency_contacts;
  }
}

fn require(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(())
}

/// The subset of [`Profile`] an approved employee may still change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactUpdate {
  pub preferred_name:     Option<String>,
  pub address:            Address,
  pub cell_phone:         String,
  pub work_phone:         Option<String>,
  pub emergency_contacts: Vec<EmergencyContact>,
}

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:          Uuid,
  pub username:           String,
  pub email:              String,
  /// PHC string produced by argon2; never serialised.
  #[serde(skip_serializing, default)]
  pub password_hash:      String,
  pub created_at:         DateTime<Utc>,
  /// Legal name as written on the registration token, before onboarding.
  pub invited_first_name: String,
  pub invited_last_name:  String,
  pub profile:            Option<Profile>,
  pub application:        OnboardingApplication,
}

impl Person {
  pub fn work_authorization(&self) -> Option<&WorkAuthorization> {
    self.profile.as_ref().map(|p| &p.work_authorization)
  }

  pub fn is_opt(&self) -> bool {
    self.work_authorization().is_some_and(WorkAuthorization::is_opt)
  }

  pub fn display_name(&self) -> String {
    match &self.profile {
      Some(p) => p.display_name(),
      None => format!("{} {}", self.invited_first_name, self.invited_last_name),
    }
  }
}

/// Input to [`crate::store::OnboardingStore::create_person_from_token`].
#[derive(Debug, Clone)]
pub struct NewPerson {
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
}
