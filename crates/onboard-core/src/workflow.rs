//! Workflows — each one validates its input, checks the actor, and commits at
//! most one state transition through an [`OnboardingStore`].
//!
//! Nothing here retries. Errors surface to the caller as soon as they occur,
//! except for the two best-effort side effects: invitation mail delivery and
//! deletion of a replaced file, which are logged and swallowed.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::Actor,
  application::{ApplicationStatus, OnboardingApplication},
  document::{
    Document, DocumentSlot, DocumentStatus, DocumentType, ReviewDecision, UploadedFile,
  },
  files::FileStorage,
  notify::Notifier,
  person::{ContactUpdate, NewPerson, Person, Profile, VisaKind, VisaStatus},
  status::{
    GateDecision, NextStep, Severity, VisaCountdown, days_remaining, next_opt_step,
    next_step_for, onboarding_gate, visa_countdown,
  },
  store::{OnboardingStore, PersonQuery, Redemption},
  token::{
    Invite, IssuedToken, RegistrationToken, TokenState, TokenView, hash_secret,
    normalize_email,
  },
};

// ─── Registration ────────────────────────────────────────────────────────────

/// Credentials chosen by the invitee at registration. The password has
/// already been hashed by the transport layer.
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  pub password_hash: String,
}

const MIN_PASSWORD_LEN: usize = 8;

/// Check a username and plaintext password before hashing.
pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
  let len_ok = (3..=32).contains(&username.len());
  let chars_ok = username
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
  if !len_ok || !chars_ok {
    return Err(Error::Validation(
      "username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
    ));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::Validation(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}

fn validate_invite(invite: &Invite) -> Result<()> {
  let email = invite.email.trim();
  let well_formed = email
    .split_once('@')
    .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
  if !well_formed {
    return Err(Error::Validation(format!("{email:?} is not an email address")));
  }
  if invite.first_name.trim().is_empty() || invite.last_name.trim().is_empty() {
    return Err(Error::Validation("first and last name are required".into()));
  }
  Ok(())
}

/// Issue a registration token and mail the invitation link.
///
/// The token is persisted before the mail is attempted; a delivery failure
/// is logged and reported through [`IssuedToken::email_sent`] but leaves the
/// token valid.
pub async fn issue_token<S, N>(
  store: &S,
  notifier: &N,
  actor: &Actor,
  invite: Invite,
  base_url: &str,
  now: DateTime<Utc>,
) -> Result<IssuedToken>
where
  S: OnboardingStore,
  N: Notifier,
{
  actor.require_hr()?;
  validate_invite(&invite)?;

  let email = normalize_email(&invite.email);
  if store.find_person_by_email(&email).await.map_err(Error::store)?.is_some() {
    return Err(Error::EmailTaken(email));
  }

  let (token, secret) = RegistrationToken::issue(&invite, actor.username(), now);
  let token = store.save_token(token).await.map_err(Error::store)?;
  let registration_url =
    format!("{}/register/{secret}", base_url.trim_end_matches('/'));

  tracing::info!(token_id = %token.token_id, email = %token.email, "issued registration token");

  let subject = "Your onboarding invitation";
  let body = format!(
    "Hello {} {},\n\nPlease complete your registration at:\n\n{registration_url}\n\n\
     This link expires at {}.",
    token.first_name,
    token.last_name,
    token.expires_at.to_rfc3339(),
  );
  let email_sent = match notifier.send(&token.email, subject, &body).await {
    Ok(()) => true,
    Err(e) => {
      tracing::warn!(token_id = %token.token_id, error = %e, "invitation mail not delivered");
      false
    }
  };

  Ok(IssuedToken { token, secret, registration_url, email_sent })
}

pub async fn list_tokens<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  now: DateTime<Utc>,
) -> Result<Vec<TokenView>> {
  actor.require_hr()?;
  let tokens = store.list_tokens().await.map_err(Error::store)?;
  Ok(
    tokens
      .into_iter()
      .map(|token| {
        let state = token.state(now);
        TokenView { token, state }
      })
      .collect(),
  )
}

/// Resolve `secret` to a token that can still be redeemed. Unknown, used and
/// expired tokens each produce a distinct error.
pub async fn inspect_token<S: OnboardingStore>(
  store: &S,
  secret: &str,
  now: DateTime<Utc>,
) -> Result<RegistrationToken> {
  let token = store
    .find_token_by_hash(&hash_secret(secret.trim()))
    .await
    .map_err(Error::store)?
    .ok_or(Error::TokenNotFound)?;

  match token.state(now) {
    TokenState::Active => Ok(token),
    TokenState::Used => Err(Error::TokenUsed),
    TokenState::Expired => Err(Error::TokenExpired),
  }
}

/// Create the invitee's account from an active token.
pub async fn redeem_token<S: OnboardingStore>(
  store: &S,
  secret: &str,
  account: NewAccount,
  now: DateTime<Utc>,
) -> Result<Person> {
  let token = inspect_token(store, secret, now).await?;

  if store
    .find_person_by_email(&token.email)
    .await
    .map_err(Error::store)?
    .is_some()
  {
    return Err(Error::EmailTaken(token.email));
  }
  if store
    .find_person_by_username(&account.username)
    .await
    .map_err(Error::store)?
    .is_some()
  {
    return Err(Error::UsernameTaken(account.username));
  }

  let input = NewPerson {
    username:      account.username.clone(),
    email:         token.email.clone(),
    password_hash: account.password_hash,
    first_name:    token.first_name.clone(),
    last_name:     token.last_name.clone(),
  };
  // The checks above can race another redemption; the store has the last word.
  let person = match store
    .create_person_from_token(token.token_id, input)
    .await
    .map_err(Error::store)?
  {
    Redemption::Created(person) => person,
    Redemption::TokenUsed => return Err(Error::TokenUsed),
    Redemption::UsernameTaken => return Err(Error::UsernameTaken(account.username)),
    Redemption::EmailTaken => return Err(Error::EmailTaken(token.email)),
  };

  tracing::info!(person_id = %person.person_id, token_id = %token.token_id, "registered");
  Ok(person)
}

// ─── Onboarding application ──────────────────────────────────────────────────

async fn load_person<S: OnboardingStore>(store: &S, id: Uuid) -> Result<Person> {
  store
    .get_person(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::PersonNotFound(id))
}

/// Submit (or resubmit after a rejection) the onboarding profile.
pub async fn submit_application<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  profile: Profile,
  now: DateTime<Utc>,
) -> Result<Person> {
  let person_id = actor.require_employee()?;
  let person = load_person(store, person_id).await?;

  if !person.application.accepts_submission() {
    return Err(Error::InvalidTransition {
      from: person.application.status,
      to:   ApplicationStatus::Pending,
    });
  }
  profile.validate()?;

  if profile.work_authorization.is_opt()
    && store
      .find_document(person_id, DocumentType::OptReceipt)
      .await
      .map_err(Error::store)?
      .is_none()
  {
    return Err(Error::Validation(format!(
      "{} holders must upload their OPT receipt before submitting",
      VisaKind::F1CptOpt
    )));
  }

  let application = OnboardingApplication {
    status:       ApplicationStatus::Pending,
    feedback:     None,
    submitted_at: Some(now),
    reviewed_at:  None,
  };
  let person = store
    .set_application(person_id, application, Some(profile))
    .await
    .map_err(Error::store)?
    .ok_or(Error::PersonNotFound(person_id))?;

  tracing::info!(%person_id, "onboarding application submitted");
  Ok(person)
}

/// Trimmed feedback, or `MissingFeedback` when a rejection carries none.
fn review_feedback(rejecting: bool, feedback: Option<String>) -> Result<String> {
  let feedback = feedback
    .map(|f| f.trim().to_owned())
    .filter(|f| !f.is_empty());
  match feedback {
    Some(f) => Ok(f),
    None if rejecting => Err(Error::MissingFeedback),
    None => Ok(String::new()),
  }
}

/// HR's decision on an onboarding application.
///
/// `decision` must be one of `pending`, `approved` or `rejected`.
pub async fn review_application<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  person_id: Uuid,
  decision: &str,
  feedback: Option<String>,
  now: DateTime<Utc>,
) -> Result<Person> {
  actor.require_hr()?;
  let status = ApplicationStatus::from_str(decision)
    .ok()
    .filter(|s| *s != ApplicationStatus::NeverSubmitted)
    .ok_or_else(|| Error::InvalidDecision(decision.to_owned()))?;
  let feedback = review_feedback(status == ApplicationStatus::Rejected, feedback)?;

  let person = load_person(store, person_id).await?;
  if !person.application.accepts_review() {
    return Err(Error::InvalidTransition {
      from: person.application.status,
      to:   status,
    });
  }

  let application = OnboardingApplication {
    status,
    feedback: Some(feedback),
    submitted_at: person.application.submitted_at,
    reviewed_at: Some(now),
  };
  let person = store
    .set_application(person_id, application, None)
    .await
    .map_err(Error::store)?
    .ok_or(Error::PersonNotFound(person_id))?;

  tracing::info!(%person_id, %status, reviewer = actor.username(), "application reviewed");
  Ok(person)
}

/// Update the editable contact fields of an approved employee.
pub async fn update_contact<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  update: ContactUpdate,
) -> Result<Person> {
  let person_id = actor.require_employee()?;
  let person = load_person(store, person_id).await?;
  require_clear_gate(&person)?;

  let mut profile = person
    .profile
    .ok_or_else(|| Error::Validation("no profile on file".into()))?;
  profile.apply_contact(update);
  profile.validate()?;

  store
    .update_profile(person_id, profile)
    .await
    .map_err(Error::store)?
    .ok_or(Error::PersonNotFound(person_id))
}

fn require_clear_gate(person: &Person) -> Result<()> {
  if onboarding_gate(&person.application).is_clear() {
    Ok(())
  } else {
    Err(Error::Forbidden(
      "available once the onboarding application is approved".into(),
    ))
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Store an uploaded file as `person_id`'s document of type `doc_type`,
/// replacing any earlier upload of that type.
///
/// The new file is saved and the record upserted before the old file is
/// deleted; if that deletion fails the old file is left behind and the
/// failure is only logged.
pub async fn upload_or_replace<S, F>(
  store: &S,
  files: &F,
  actor: &Actor,
  person_id: Uuid,
  doc_type: &str,
  file: UploadedFile,
  now: DateTime<Utc>,
) -> Result<Document>
where
  S: OnboardingStore,
  F: FileStorage,
{
  actor.require_self_or_hr(person_id)?;
  let doc_type = DocumentType::parse(doc_type)?;
  if file.bytes.is_empty() {
    return Err(Error::MissingFile);
  }

  let person = load_person(store, person_id).await?;
  if !actor.is_hr() && doc_type.requires_clear_gate() {
    require_clear_gate(&person)?;
  }

  let existing = store
    .find_document(person_id, doc_type)
    .await
    .map_err(Error::store)?;

  let stored_name = files
    .save(&file.bytes, &file.original_name)
    .await
    .map_err(Error::FileStorage)?;

  let document = Document {
    document_id: existing.as_ref().map_or_else(Uuid::new_v4, |d| d.document_id),
    person_id,
    doc_type,
    status: DocumentStatus::Pending,
    feedback: None,
    stored_name,
    original_name: file.original_name,
    content_type: file.content_type,
    uploaded_at: now,
    reviewed_at: None,
  };

  let saved = match store.upsert_document(document.clone()).await {
    Ok(saved) => saved,
    Err(e) => {
      if let Err(cleanup) = files.delete(&document.stored_name).await {
        tracing::warn!(stored_name = %document.stored_name, error = %cleanup, "orphaned upload");
      }
      return Err(Error::store(e));
    }
  };

  if let Some(old) = existing
    && old.stored_name != saved.stored_name
    && let Err(e) = files.delete(&old.stored_name).await
  {
    tracing::warn!(stored_name = %old.stored_name, error = %e, "could not delete replaced file");
  }

  tracing::info!(%person_id, %doc_type, document_id = %saved.document_id, "document uploaded");
  Ok(saved)
}

/// HR's verdict on one document.
///
/// Feedback is validated before the store is touched.
pub async fn review_document<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  document_id: Uuid,
  decision: &str,
  feedback: Option<String>,
  now: DateTime<Utc>,
) -> Result<Document> {
  actor.require_hr()?;
  let decision = ReviewDecision::from_str(decision)
    .map_err(|_| Error::InvalidDecision(decision.to_owned()))?;
  let feedback = review_feedback(decision == ReviewDecision::Rejected, feedback)?;

  let mut document = store
    .get_document(document_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::DocumentNotFound(document_id))?;

  document.status = decision.into();
  document.feedback = Some(feedback);
  document.reviewed_at = Some(now);

  let document = store.upsert_document(document).await.map_err(Error::store)?;
  tracing::info!(
    %document_id,
    status = %document.status,
    reviewer = actor.username(),
    "document reviewed"
  );
  Ok(document)
}

/// Every document type for `person_id`, with `not_uploaded` for the gaps.
pub async fn document_slots<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  person_id: Uuid,
) -> Result<Vec<DocumentSlot>> {
  actor.require_self_or_hr(person_id)?;
  load_person(store, person_id).await?;
  let documents = store.list_documents(person_id).await.map_err(Error::store)?;
  Ok(DocumentSlot::all(documents))
}

/// Fetch a document and its file contents.
pub async fn open_document<S, F>(
  store: &S,
  files: &F,
  actor: &Actor,
  document_id: Uuid,
) -> Result<(Document, Vec<u8>)>
where
  S: OnboardingStore,
  F: FileStorage,
{
  let document = store
    .get_document(document_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::DocumentNotFound(document_id))?;
  actor.require_self_or_hr(document.person_id)?;

  let bytes = files.read(&document.stored_name).await.map_err(|e| {
    if e.kind() == std::io::ErrorKind::NotFound {
      Error::FileNotFound(document.stored_name.clone())
    } else {
      Error::FileStorage(e)
    }
  })?;
  Ok((document, bytes))
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Everything the employee dashboard (and HR's employee page) shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub person:    Person,
  pub gate:      GateDecision,
  pub documents: Vec<DocumentSlot>,
  pub next_step: Option<NextStep>,
  pub visa:      Option<VisaCountdown>,
}

pub async fn dashboard<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  person_id: Uuid,
  now: DateTime<Utc>,
) -> Result<Dashboard> {
  actor.require_self_or_hr(person_id)?;
  let person = load_person(store, person_id).await?;
  let documents = DocumentSlot::all(
    store.list_documents(person_id).await.map_err(Error::store)?,
  );

  Ok(Dashboard {
    gate: onboarding_gate(&person.application),
    next_step: next_step_for(&person, &documents),
    visa: visa_countdown(&person, now),
    documents,
    person,
  })
}

/// The caller's OPT next step; `None` if they are not on the OPT pipeline.
pub async fn next_step<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
) -> Result<Option<NextStep>> {
  let person_id = actor.require_employee()?;
  let person = load_person(store, person_id).await?;
  if !person.is_opt() {
    return Ok(None);
  }
  let documents = store.list_documents(person_id).await.map_err(Error::store)?;
  Ok(next_step_for(&person, &DocumentSlot::all(documents)))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
  pub person_id:    Uuid,
  pub username:     String,
  pub email:        String,
  pub name:         String,
  pub status:       ApplicationStatus,
  pub feedback:     Option<String>,
  pub submitted_at: Option<DateTime<Utc>>,
  pub reviewed_at:  Option<DateTime<Utc>>,
}

impl From<Person> for ApplicationSummary {
  fn from(p: Person) -> Self {
    Self {
      name:         p.display_name(),
      person_id:    p.person_id,
      username:     p.username,
      email:        p.email,
      status:       p.application.status,
      feedback:     p.application.feedback,
      submitted_at: p.application.submitted_at,
      reviewed_at:  p.application.reviewed_at,
    }
  }
}

pub async fn list_applications<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  query: &PersonQuery,
) -> Result<Vec<ApplicationSummary>> {
  actor.require_hr()?;
  let persons = store.list_persons(query).await.map_err(Error::store)?;
  Ok(persons.into_iter().map(ApplicationSummary::from).collect())
}

// ─── Visa tracking ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct VisaTrackingEntry {
  pub person_id: Uuid,
  pub name:      String,
  pub email:     String,
  pub visa:      VisaStatus,
  pub countdown: VisaCountdown,
  pub next_step: Option<NextStep>,
}

/// Every employee on a work visa, most urgent first.
pub async fn visa_tracking<S: OnboardingStore>(
  store: &S,
  actor: &Actor,
  search: Option<String>,
  now: DateTime<Utc>,
) -> Result<Vec<VisaTrackingEntry>> {
  actor.require_hr()?;
  let query = PersonQuery { search, application_status: None };
  let persons = store.list_persons(&query).await.map_err(Error::store)?;

  let mut entries = Vec::new();
  for person in persons {
    let Some(visa) = person.work_authorization().and_then(|w| w.visa()).cloned()
    else {
      continue;
    };
    let next_step = if person.is_opt() {
      let documents = store
        .list_documents(person.person_id)
        .await
        .map_err(Error::store)?;
      next_step_for(&person, &DocumentSlot::all(documents))
    } else {
      None
    };
    entries.push(VisaTrackingEntry {
      person_id: person.person_id,
      name: person.display_name(),
      email: person.email.clone(),
      countdown: days_remaining(visa.end_date, now),
      visa,
      next_step,
    });
  }

  entries.sort_by_key(|e| e.countdown.days);
  Ok(entries)
}

/// Mail an OPT employee their current next step.
pub async fn nudge<S, N>(
  store: &S,
  notifier: &N,
  actor: &Actor,
  person_id: Uuid,
) -> Result<NextStep>
where
  S: OnboardingStore,
  N: Notifier,
{
  actor.require_hr()?;
  let person = load_person(store, person_id).await?;
  if !person.is_opt() {
    return Err(Error::Validation(format!(
      "{} is not on the OPT document pipeline",
      person.username
    )));
  }

  let documents = store.list_documents(person_id).await.map_err(Error::store)?;
  let step = next_opt_step(&DocumentSlot::all(documents));
  if step.severity == Severity::Success {
    return Err(Error::Validation("all OPT documents are already approved".into()));
  }

  let mut body = format!("Hello {},\n\nNext step: {}.", person.display_name(), step.instruction);
  if let Some(hint) = step.hint {
    body.push_str(&format!("\nTip: {hint}."));
  }
  if let Some(feedback) = step.feedback.as_deref().filter(|f| !f.is_empty()) {
    body.push_str(&format!("\nReviewer feedback: {feedback}"));
  }
  notifier
    .send(&person.email, "Action needed on your visa documents", &body)
    .await?;

  tracing::info!(%person_id, instruction = %step.instruction, "sent next-step reminder");
  Ok(step)
}
