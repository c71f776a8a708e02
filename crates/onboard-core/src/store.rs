//! The `OnboardingStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `onboard-store-sqlite`).
//! Workflows and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  application::{ApplicationStatus, OnboardingApplication},
  document::{Document, DocumentType},
  person::{NewPerson, Person, Profile},
  token::RegistrationToken,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`OnboardingStore::list_persons`].
#[derive(Debug, Clone, Default)]
pub struct PersonQuery {
  /// Case-insensitive substring over username, email and names.
  pub search:             Option<String>,
  pub application_status: Option<ApplicationStatus>,
}

/// Outcome of [`OnboardingStore::create_person_from_token`].
#[derive(Debug)]
pub enum Redemption {
  Created(Person),
  /// Another redemption consumed the token first.
  TokenUsed,
  UsernameTaken,
  EmailTaken,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an onboarding store backend.
///
/// Every state transition is a single write that the backend commits
/// atomically. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait OnboardingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Persons ───────────────────────────────────────────────────────────

  /// Create a person and mark `token_id` used by them, in one transaction.
  ///
  /// Nothing is created unless the outcome is [`Redemption::Created`]: a
  /// consumed token or a username/email that is already held leaves the
  /// store untouched, so exactly one person is ever created per token.
  fn create_person_from_token(
    &self,
    token_id: Uuid,
    input: NewPerson,
  ) -> impl Future<Output = Result<Redemption, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn find_person_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn find_person_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn list_persons<'a>(
    &'a self,
    query: &'a PersonQuery,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + 'a;

  /// Replace a person's profile. Returns `None` if the person does not exist.
  fn update_profile(
    &self,
    id: Uuid,
    profile: Profile,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Replace a person's onboarding application, optionally together with the
  /// profile it was submitted with. Returns `None` if the person does not
  /// exist.
  fn set_application(
    &self,
    id: Uuid,
    application: OnboardingApplication,
    profile: Option<Profile>,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn find_document(
    &self,
    person_id: Uuid,
    doc_type: DocumentType,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  fn list_documents(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Insert `document`, or overwrite the existing row for its
  /// `(person_id, doc_type)` pair keeping that row's id. Returns the stored
  /// record.
  fn upsert_document(
    &self,
    document: Document,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  // ── Registration tokens ───────────────────────────────────────────────

  fn save_token(
    &self,
    token: RegistrationToken,
  ) -> impl Future<Output = Result<RegistrationToken, Self::Error>> + Send + '_;

  /// Look a token up by the SHA-256 digest of its secret.
  fn find_token_by_hash<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<Option<RegistrationToken>, Self::Error>> + Send + 'a;

  /// All tokens, newest first.
  fn list_tokens(
    &self,
  ) -> impl Future<Output = Result<Vec<RegistrationToken>, Self::Error>> + Send + '_;
}
