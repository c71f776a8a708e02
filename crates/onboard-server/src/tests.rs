//! Router tests over an in-memory store and a scratch upload directory.

use std::{path::PathBuf, sync::Arc};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{Duration, Utc};
use onboard_core::{
  store::OnboardingStore,
  token::{Invite, RegistrationToken, TOKEN_LIFETIME},
};
use onboard_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  AppState, ServerConfig,
  auth::AuthConfig,
  mailer::{MailConfig, MailTransport, Mailer},
  router,
  storage::DiskStorage,
};

const HR_USERNAME: &str = "admin";
const HR_PASSWORD: &str = "hr-secret-pass";
const PASSWORD: &str = "employee-pass";

fn scratch_dir(label: &str) -> PathBuf {
  std::env::temp_dir().join(format!("onboard-{label}-{}", Uuid::new_v4()))
}

async fn make_state_with(mail: MailConfig) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let salt  = SaltString::generate(&mut OsRng);
  let hash  = Argon2::default()
    .hash_password(HR_PASSWORD.as_bytes(), &salt)
    .unwrap()
    .to_string();

  let upload_dir   = scratch_dir("uploads");
  let template_dir = scratch_dir("templates");
  tokio::fs::create_dir_all(&template_dir).await.unwrap();
  tokio::fs::write(template_dir.join("i983-sample.pdf"), b"%PDF sample").await.unwrap();

  let config = ServerConfig {
    host:             "127.0.0.1".to_string(),
    port:             8080,
    base_url:         "http://localhost:8080/".to_string(),
    store_path:       PathBuf::from(":memory:"),
    upload_dir:       upload_dir.clone(),
    template_dir:     template_dir.clone(),
    max_upload_bytes: 1024 * 1024,
    hr_username:      HR_USERNAME.to_string(),
    hr_password_hash: hash.clone(),
    mail:             mail.clone(),
  };

  AppState {
    store:     Arc::new(store),
    files:     Arc::new(DiskStorage::new(upload_dir)),
    templates: Arc::new(DiskStorage::new(template_dir)),
    mailer:    Arc::new(Mailer::from_config(&mail).unwrap()),
    config:    Arc::new(config),
    auth:      Arc::new(AuthConfig {
      hr_username:      HR_USERNAME.to_string(),
      hr_password_hash: hash,
    }),
  }
}

async fn make_state() -> AppState<SqliteStore> {
  make_state_with(MailConfig::default()).await
}

fn basic(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

fn hr() -> String { basic(HR_USERNAME, HR_PASSWORD) }

async fn oneshot_raw(
  state:        &AppState<SqliteStore>,
  method:       &str,
  uri:          &str,
  auth:         Option<&str>,
  content_type: Option<&str>,
  body:         Body,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(auth) = auth {
    builder = builder.header(header::AUTHORIZATION, auth);
  }
  if let Some(ct) = content_type {
    builder = builder.header(header::CONTENT_TYPE, ct);
  }
  router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn read_json(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  }
}

async fn call(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  auth:   Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let resp = match body {
    Some(v) => {
      oneshot_raw(state, method, uri, auth, Some("application/json"), Body::from(v.to_string()))
        .await
    }
    None => oneshot_raw(state, method, uri, auth, None, Body::empty()).await,
  };
  let status = resp.status();
  (status, read_json(resp).await)
}

async fn upload(
  state:    &AppState<SqliteStore>,
  auth:     &str,
  doc_type: &str,
  bytes:    &'static [u8],
) -> (StatusCode, Value) {
  upload_at(state, auth, &format!("/api/me/documents/{doc_type}?filename=scan.pdf"), bytes).await
}

async fn upload_at(
  state: &AppState<SqliteStore>,
  auth:  &str,
  uri:   &str,
  bytes: &'static [u8],
) -> (StatusCode, Value) {
  let resp = oneshot_raw(state, "PUT", uri, Some(auth), Some("application/pdf"), Body::from(bytes))
    .await;
  let status = resp.status();
  (status, read_json(resp).await)
}

/// Issue an invitation as HR and redeem it; returns the employee's auth
/// header and person id.
async fn register(state: &AppState<SqliteStore>, username: &str) -> (String, Uuid) {
  let (status, issued) = call(
    state,
    "POST",
    "/api/hr/tokens",
    Some(&hr()),
    Some(json!({
      "email": format!("{username}@example.com"),
      "first_name": "Ada",
      "last_name": "Lovelace",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{issued}");

  let (status, person) = call(
    state,
    "POST",
    "/api/registration",
    None,
    Some(json!({
      "token": issued["secret"],
      "username": username,
      "password": PASSWORD,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{person}");

  let id = person["person_id"].as_str().unwrap().parse().unwrap();
  (basic(username, PASSWORD), id)
}

fn profile(work_authorization: Value) -> Value {
  json!({
    "first_name": "Ada",
    "last_name": "Lovelace",
    "middle_name": null,
    "preferred_name": "Countess",
    "date_of_birth": "1990-12-10",
    "ssn": "123-45-6789",
    "gender": "female",
    "address": {
      "street": "1 Analytical Way",
      "building": null,
      "city": "New York",
      "state": "NY",
      "zip": "10001"
    },
    "cell_phone": "555-0100",
    "work_phone": null,
    "emergency_contacts": [
      { "name": "Charles Babbage", "phone": "555-0101", "email": null, "relationship": "friend" }
    ],
    "reference": null,
    "work_authorization": work_authorization,
  })
}

fn opt_visa() -> Value {
  let end = Utc::now().date_naive() + Duration::days(60);
  json!({
    "category": "work_visa",
    "kind": "F1(CPT/OPT)",
    "start_date": "2024-01-01",
    "end_date": end.to_string(),
  })
}

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn invitation_is_single_use() {
  let state = make_state().await;
  let (status, issued) = call(
    &state,
    "POST",
    "/api/hr/tokens",
    Some(&hr()),
    Some(json!({ "email": "New.Hire@Example.com", "first_name": "New", "last_name": "Hire" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(issued["email_sent"], true);
  let secret = issued["secret"].as_str().unwrap().to_owned();
  assert_eq!(
    issued["registration_url"].as_str().unwrap(),
    format!("http://localhost:8080/register/{secret}")
  );
  assert!(issued["token"].get("token_hash").is_none());

  let (status, invitation) =
    call(&state, "GET", &format!("/api/registration/{secret}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(invitation["email"], "new.hire@example.com");

  let redeem = json!({ "token": secret, "username": "newhire", "password": PASSWORD });
  let (status, person) =
    call(&state, "POST", "/api/registration", None, Some(redeem.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(person["application"]["status"], "never_submitted");
  assert!(person.get("password_hash").is_none());

  let (status, err) = call(&state, "POST", "/api/registration", None, Some(redeem)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(err["kind"], "conflict");

  let (_, tokens) = call(&state, "GET", "/api/hr/tokens", Some(&hr()), None).await;
  assert_eq!(tokens[0]["state"], "used");
}

#[tokio::test]
async fn hr_username_cannot_be_registered() {
  let state = make_state().await;
  let (_, issued) = call(
    &state,
    "POST",
    "/api/hr/tokens",
    Some(&hr()),
    Some(json!({ "email": "ada@example.com", "first_name": "Ada", "last_name": "Lovelace" })),
  )
  .await;
  let secret = issued["secret"].clone();

  let (status, err) = call(
    &state,
    "POST",
    "/api/registration",
    None,
    Some(json!({ "token": secret, "username": HR_USERNAME, "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT, "{err}");
  assert_eq!(err["kind"], "conflict");
  assert!(state.store.find_person_by_username(HR_USERNAME).await.unwrap().is_none());

  // The token survives and the HR login still works.
  let (status, _) = call(
    &state,
    "POST",
    "/api/registration",
    None,
    Some(json!({ "token": secret, "username": "ada", "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call(&state, "GET", "/api/hr/tokens", Some(&hr()), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_rejected_even_if_unused() {
  let state = make_state().await;
  let invite = Invite {
    email:      "late@example.com".into(),
    first_name: "Late".into(),
    last_name:  "Comer".into(),
  };
  let issued_at = Utc::now() - TOKEN_LIFETIME - Duration::seconds(1);
  let (token, secret) = RegistrationToken::issue(&invite, "hr", issued_at);
  state.store.save_token(token).await.unwrap();

  let (status, err) =
    call(&state, "GET", &format!("/api/registration/{secret}"), None, None).await;
  assert_eq!(status, StatusCode::GONE);
  assert_eq!(err["kind"], "expired");

  let (status, _) = call(
    &state,
    "POST",
    "/api/registration",
    None,
    Some(json!({ "token": secret, "username": "late", "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::GONE);
  assert!(state.store.find_person_by_username("late").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_token_and_bad_credentials() {
  let state = make_state().await;
  let (status, err) = call(&state, "GET", "/api/registration/deadbeef", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(err["kind"], "not_found");

  let (_, issued) = call(
    &state,
    "POST",
    "/api/hr/tokens",
    Some(&hr()),
    Some(json!({ "email": "x@example.com", "first_name": "X", "last_name": "Y" })),
  )
  .await;
  let (status, err) = call(
    &state,
    "POST",
    "/api/registration",
    None,
    Some(json!({ "token": issued["secret"], "username": "xy", "password": "short" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(err["kind"], "validation");
}

#[tokio::test]
async fn mail_failure_keeps_token() {
  let state = make_state_with(MailConfig {
    transport: MailTransport::Http,
    api_url: Some("http://127.0.0.1:9/send".into()),
    ..MailConfig::default()
  })
  .await;

  let (status, issued) = call(
    &state,
    "POST",
    "/api/hr/tokens",
    Some(&hr()),
    Some(json!({ "email": "m@example.com", "first_name": "M", "last_name": "N" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(issued["email_sent"], false);

  let (_, tokens) = call(&state, "GET", "/api/hr/tokens", Some(&hr()), None).await;
  assert_eq!(tokens.as_array().unwrap().len(), 1);
  assert_eq!(tokens[0]["state"], "active");

  let secret = issued["secret"].as_str().unwrap();
  let (status, _) = call(&state, "GET", &format!("/api/registration/{secret}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthenticated_requests_return_401() {
  let state = make_state().await;
  let resp = oneshot_raw(&state, "GET", "/api/hr/tokens", None, None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let wrong = basic(HR_USERNAME, "not-the-password");
  let (status, _) = call(&state, "GET", "/api/hr/tokens", Some(&wrong), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let nobody = basic("nobody", PASSWORD);
  let (status, _) = call(&state, "GET", "/api/me", Some(&nobody), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn roles_are_enforced() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;

  let (status, err) = call(&state, "GET", "/api/hr/tokens", Some(&employee), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(err["kind"], "authorization");

  let (status, _) = call(&state, "GET", "/api/me", Some(&hr()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, dashboard) = call(&state, "GET", "/api/me", Some(&employee), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(dashboard["gate"]["gate"], "blocked_never_submitted");
  assert_eq!(dashboard["documents"].as_array().unwrap().len(), 7);

  let (status, _) = call(
    &state,
    "GET",
    &format!("/api/hr/employees/{person_id}"),
    Some(&employee),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_document_type_creates_nothing() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;

  let (status, err) = upload(&state, &employee, "passport", b"%PDF").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(err["kind"], "validation");

  let (_, slots) = call(&state, "GET", "/api/me/documents", Some(&employee), None).await;
  assert!(slots.as_array().unwrap().iter().all(|s| s["status"] == "not_uploaded"));
  assert!(state.store.list_documents(person_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn hr_uploads_on_behalf_of_employee() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;
  let uri = format!("/api/hr/employees/{person_id}/documents/opt_ead?filename=ead.pdf");

  // The employee has to wait for approval; HR does not.
  let (status, _) = upload(&state, &employee, "opt_ead", b"%PDF ead").await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = upload_at(&state, &employee, &uri, b"%PDF ead").await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, doc) = upload_at(&state, &hr(), &uri, b"%PDF ead").await;
  assert_eq!(status, StatusCode::OK, "{doc}");
  assert_eq!(doc["doc_type"], "opt_ead");
  assert_eq!(doc["status"], "pending");
  assert_eq!(doc["original_name"], "ead.pdf");
  assert_eq!(doc["person_id"], person_id.to_string());

  let (_, slots) = call(&state, "GET", "/api/me/documents", Some(&employee), None).await;
  let ead = slots
    .as_array()
    .unwrap()
    .iter()
    .find(|s| s["doc_type"] == "opt_ead")
    .unwrap();
  assert_eq!(ead["status"], "pending");

  let (status, _) = upload_at(&state, &hr(), &uri, b"").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let stranger = format!("/api/hr/employees/{}/documents/opt_ead", Uuid::new_v4());
  let (status, _) = upload_at(&state, &hr(), &stranger, b"%PDF ead").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
  let state = make_state().await;
  let (employee, _) = register(&state, "ada").await;
  let (status, _) = upload(&state, &employee, "opt_receipt", b"").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejection_without_feedback_leaves_document_untouched() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;
  let (status, doc) = upload(&state, &employee, "opt_receipt", b"%PDF receipt").await;
  assert_eq!(status, StatusCode::OK);
  let doc_id = doc["document_id"].as_str().unwrap().to_owned();

  let (status, err) = call(
    &state,
    "POST",
    &format!("/api/hr/documents/{doc_id}/review"),
    Some(&hr()),
    Some(json!({ "decision": "rejected", "feedback": "" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(err["kind"], "validation");

  let (_, slots) = call(
    &state,
    "GET",
    &format!("/api/hr/employees/{person_id}/documents"),
    Some(&hr()),
    None,
  )
  .await;
  let receipt = slots
    .as_array()
    .unwrap()
    .iter()
    .find(|s| s["doc_type"] == "opt_receipt")
    .unwrap();
  assert_eq!(receipt["status"], "pending");
}

#[tokio::test]
async fn reupload_replaces_file_and_resets_review() {
  let state = make_state().await;
  let (employee, _) = register(&state, "ada").await;

  let (_, first) = upload(&state, &employee, "drivers_license", b"front").await;
  let old_name = first["stored_name"].as_str().unwrap().to_owned();
  let doc_id = first["document_id"].as_str().unwrap().to_owned();
  assert!(state.config.upload_dir.join(&old_name).exists());

  let (status, _) = call(
    &state,
    "POST",
    &format!("/api/hr/documents/{doc_id}/review"),
    Some(&hr()),
    Some(json!({ "decision": "rejected", "feedback": "too blurry" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, second) = upload(&state, &employee, "drivers_license", b"front, sharper").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(second["document_id"], doc_id.as_str());
  assert_eq!(second["status"], "pending");
  assert!(second["feedback"].is_null());

  let new_name = second["stored_name"].as_str().unwrap();
  assert_ne!(new_name, old_name);
  assert!(!state.config.upload_dir.join(&old_name).exists());

  let resp = oneshot_raw(
    &state,
    "GET",
    &format!("/api/documents/{doc_id}/file"),
    Some(&employee),
    None,
    Body::empty(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"front, sharper");

  // Another employee cannot read it.
  let (other, _) = register(&state, "grace").await;
  let (status, _) =
    call(&state, "GET", &format!("/api/documents/{doc_id}/file"), Some(&other), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Onboarding and the OPT pipeline ─────────────────────────────────────────

#[tokio::test]
async fn opt_onboarding_flow() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;

  // OPT receipt must come first.
  let (status, _) = call(
    &state,
    "POST",
    "/api/me/onboarding",
    Some(&employee),
    Some(profile(opt_visa())),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, receipt) = upload(&state, &employee, "opt_receipt", b"%PDF receipt").await;
  let (status, person) = call(
    &state,
    "POST",
    "/api/me/onboarding",
    Some(&employee),
    Some(profile(opt_visa())),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{person}");
  assert_eq!(person["application"]["status"], "pending");

  // Pending applications cannot be resubmitted.
  let (status, _) = call(
    &state,
    "POST",
    "/api/me/onboarding",
    Some(&employee),
    Some(profile(opt_visa())),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Later OPT documents wait for approval.
  let (status, _) = upload(&state, &employee, "opt_ead", b"%PDF ead").await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, step) = call(&state, "GET", "/api/me/next-step", Some(&employee), None).await;
  assert_eq!(step["severity"], "info");
  assert_eq!(step["instruction"], "waiting for HR to approve opt_receipt");

  let (status, pending) = call(
    &state,
    "GET",
    "/api/hr/applications?status=pending",
    Some(&hr()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);
  assert_eq!(pending[0]["name"], "Countess Lovelace");

  let (status, person) = call(
    &state,
    "POST",
    &format!("/api/hr/employees/{person_id}/review"),
    Some(&hr()),
    Some(json!({ "decision": "approved" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(person["application"]["status"], "approved");

  let receipt_id = receipt["document_id"].as_str().unwrap();
  let (status, _) = call(
    &state,
    "POST",
    &format!("/api/hr/documents/{receipt_id}/review"),
    Some(&hr()),
    Some(json!({ "decision": "approved" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (_, step) = call(&state, "GET", "/api/me/next-step", Some(&employee), None).await;
  assert_eq!(step["severity"], "warning");
  assert_eq!(step["doc_type"], "opt_ead");

  let (status, _) = upload(&state, &employee, "opt_ead", b"%PDF ead").await;
  assert_eq!(status, StatusCode::OK);

  let (status, visa) = call(&state, "GET", "/api/hr/visa", Some(&hr()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(visa.as_array().unwrap().len(), 1);
  assert_eq!(visa[0]["countdown"]["severity"], "warning");
  assert_eq!(visa[0]["next_step"]["instruction"], "waiting for HR to approve opt_ead");

  let (status, step) = call(
    &state,
    "POST",
    &format!("/api/hr/employees/{person_id}/nudge"),
    Some(&hr()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(step["doc_type"], "opt_ead");

  let (status, dashboard) = call(
    &state,
    "GET",
    &format!("/api/hr/employees/{person_id}"),
    Some(&hr()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(dashboard["gate"]["gate"], "clear");
}

#[tokio::test]
async fn rejected_application_can_be_resubmitted() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;
  let review_uri = format!("/api/hr/employees/{person_id}/review");

  // Nothing to review yet.
  let (status, _) = call(
    &state,
    "POST",
    &review_uri,
    Some(&hr()),
    Some(json!({ "decision": "approved" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let citizen = json!({ "category": "citizen" });
  let (status, _) =
    call(&state, "POST", "/api/me/onboarding", Some(&employee), Some(profile(citizen.clone())))
      .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = call(
    &state,
    "POST",
    &review_uri,
    Some(&hr()),
    Some(json!({ "decision": "rejected", "feedback": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &state,
    "POST",
    &review_uri,
    Some(&hr()),
    Some(json!({ "decision": "never_submitted" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, person) = call(
    &state,
    "POST",
    &review_uri,
    Some(&hr()),
    Some(json!({ "decision": "rejected", "feedback": "SSN does not match" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(person["application"]["feedback"], "SSN does not match");

  let (_, dashboard) = call(&state, "GET", "/api/me", Some(&employee), None).await;
  assert_eq!(dashboard["gate"]["gate"], "blocked_rejected");
  assert_eq!(dashboard["gate"]["feedback"], "SSN does not match");
  assert!(dashboard["next_step"].is_null());

  // Contact edits stay closed until approval.
  let contact = json!({
    "preferred_name": null,
    "address": { "street": "2 Engine St", "building": null, "city": "Boston", "state": "MA", "zip": "02101" },
    "cell_phone": "555-0200",
    "work_phone": null,
    "emergency_contacts": [
      { "name": "Charles Babbage", "phone": "555-0101", "email": null, "relationship": "friend" }
    ],
  });
  let (status, _) =
    call(&state, "PUT", "/api/me/contact", Some(&employee), Some(contact.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, person) =
    call(&state, "POST", "/api/me/onboarding", Some(&employee), Some(profile(citizen))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(person["application"]["status"], "pending");

  call(&state, "POST", &review_uri, Some(&hr()), Some(json!({ "decision": "approved" }))).await;
  let (status, person) =
    call(&state, "PUT", "/api/me/contact", Some(&employee), Some(contact)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(person["profile"]["address"]["city"], "Boston");
  assert_eq!(person["profile"]["ssn"], "123-45-6789");

  let (_, found) =
    call(&state, "GET", "/api/hr/employees?search=lovelace", Some(&hr()), None).await;
  assert_eq!(found.as_array().unwrap().len(), 1);
  assert_eq!(found[0]["status"], "approved");
}

#[tokio::test]
async fn approved_application_is_final() {
  let state = make_state().await;
  let (employee, person_id) = register(&state, "ada").await;
  let review_uri = format!("/api/hr/employees/{person_id}/review");

  call(
    &state,
    "POST",
    "/api/me/onboarding",
    Some(&employee),
    Some(profile(json!({ "category": "citizen" }))),
  )
  .await;
  let (status, _) =
    call(&state, "POST", &review_uri, Some(&hr()), Some(json!({ "decision": "approved" }))).await;
  assert_eq!(status, StatusCode::OK);

  for decision in [
    json!({ "decision": "rejected", "feedback": "changed my mind" }),
    json!({ "decision": "pending" }),
    json!({ "decision": "approved" }),
  ] {
    let (status, err) = call(&state, "POST", &review_uri, Some(&hr()), Some(decision)).await;
    assert_eq!(status, StatusCode::CONFLICT, "{err}");
  }

  let (_, dashboard) = call(&state, "GET", "/api/me", Some(&employee), None).await;
  assert_eq!(dashboard["gate"]["gate"], "clear");
  assert_eq!(dashboard["person"]["application"]["status"], "approved");
}

#[tokio::test]
async fn nudge_requires_opt_employee() {
  let state = make_state().await;
  let (_, person_id) = register(&state, "ada").await;
  let (status, err) = call(
    &state,
    "POST",
    &format!("/api/hr/employees/{person_id}/nudge"),
    Some(&hr()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(err["kind"], "validation");

  let (status, _) = call(
    &state,
    "POST",
    &format!("/api/hr/employees/{}/nudge", Uuid::new_v4()),
    Some(&hr()),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn templates_are_served_to_authenticated_callers() {
  let state = make_state().await;
  let (employee, _) = register(&state, "ada").await;

  let resp = oneshot_raw(
    &state,
    "GET",
    "/api/templates/i983-sample.pdf",
    Some(&employee),
    None,
    Body::empty(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/pdf");

  let (status, _) =
    call(&state, "GET", "/api/templates/missing.pdf", Some(&employee), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(&state, "GET", "/api/templates/..secret", Some(&employee), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
