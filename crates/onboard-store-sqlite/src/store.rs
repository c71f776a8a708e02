//! [`SqliteStore`] — the SQLite implementation of [`OnboardingStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use onboard_core::{
  application::OnboardingApplication,
  document::{Document, DocumentType},
  person::{NewPerson, Person, Profile},
  store::{OnboardingStore, PersonQuery, Redemption},
  token::RegistrationToken,
};

use crate::{
  Result,
  encode::{
    DOCUMENT_COLUMNS, PERSON_COLUMNS, RawDocument, RawPerson, RawToken,
    TOKEN_COLUMNS, encode_dt, encode_profile, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An onboarding store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single person by an arbitrary indexed column.
  async fn person_where(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE {column} = ?1"),
              rusqlite::params![value],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn document_where(
    &self,
    clause: &'static str,
    params: Vec<String>,
  ) -> Result<Option<Document>> {
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {clause}"),
              rusqlite::params_from_iter(params.iter()),
              RawDocument::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }
}

/// Escape `LIKE` wildcards so search text matches literally.
fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

/// The redemption outcome for a UNIQUE violation on `persons`, if `e` is one.
fn duplicate_person(e: &rusqlite::Error) -> Option<Redemption> {
  let rusqlite::Error::SqliteFailure(failure, Some(message)) = e else {
    return None;
  };
  if failure.code != rusqlite::ErrorCode::ConstraintViolation {
    return None;
  }
  if message.contains("persons.username") {
    Some(Redemption::UsernameTaken)
  } else if message.contains("persons.email") {
    Some(Redemption::EmailTaken)
  } else {
    None
  }
}

// ─── OnboardingStore impl ────────────────────────────────────────────────────

impl OnboardingStore for SqliteStore {
  type Error = crate::Error;

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn create_person_from_token(
    &self,
    token_id: Uuid,
    input: NewPerson,
  ) -> Result<Redemption> {
    let now = Utc::now();
    let person = Person {
      person_id:          Uuid::new_v4(),
      username:           input.username,
      email:              input.email,
      password_hash:      input.password_hash,
      created_at:         now,
      invited_first_name: input.first_name,
      invited_last_name:  input.last_name,
      profile:            None,
      application:        OnboardingApplication::default(),
    };

    let person_id_str = encode_uuid(person.person_id);
    let token_id_str  = encode_uuid(token_id);
    let at_str        = encode_dt(now);
    let username      = person.username.clone();
    let email         = person.email.clone();
    let password_hash = person.password_hash.clone();
    let first_name    = person.invited_first_name.clone();
    let last_name     = person.invited_last_name.clone();
    let status        = person.application.status.as_ref().to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = tx.execute(
          "INSERT INTO persons (
             person_id, username, email, password_hash, created_at,
             invited_first_name, invited_last_name, application_status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            person_id_str,
            username,
            email,
            password_hash,
            at_str,
            first_name,
            last_name,
            status,
          ],
        );
        if let Err(e) = inserted {
          return match duplicate_person(&e) {
            Some(outcome) => Ok(outcome),
            None => Err(e.into()),
          };
        }
        // Claim the token; zero rows means another redemption won.
        let claimed = tx.execute(
          "UPDATE registration_tokens SET used_at = ?1, used_by = ?2
           WHERE token_id = ?3 AND used_at IS NULL",
          rusqlite::params![at_str, person_id_str, token_id_str],
        )?;
        if claimed == 0 {
          return Ok(Redemption::TokenUsed);
        }
        tx.commit()?;
        Ok(Redemption::Created(person))
      })
      .await?;
    Ok(outcome)
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    self.person_where("person_id", encode_uuid(id)).await
  }

  async fn find_person_by_username(&self, username: &str) -> Result<Option<Person>> {
    self.person_where("username", username.to_owned()).await
  }

  async fn find_person_by_email(&self, email: &str) -> Result<Option<Person>> {
    self.person_where("email", email.trim().to_ascii_lowercase()).await
  }

  async fn list_persons(&self, query: &PersonQuery) -> Result<Vec<Person>> {
    let pattern = query
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(|s| format!("%{}%", escape_like(&s.to_lowercase())));
    let status = query.application_status.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawPerson> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons
           WHERE (?1 IS NULL
                  OR lower(username) LIKE ?1 ESCAPE '\\'
                  OR lower(email) LIKE ?1 ESCAPE '\\'
                  OR lower(invited_first_name || ' ' || invited_last_name) LIKE ?1 ESCAPE '\\'
                  OR lower(coalesce(json_extract(profile_json, '$.first_name'), '')
                    || ' ' || coalesce(json_extract(profile_json, '$.last_name'), '')) LIKE ?1 ESCAPE '\\'
                  OR lower(coalesce(json_extract(profile_json, '$.preferred_name'), '')) LIKE ?1 ESCAPE '\\')
             AND (?2 IS NULL OR application_status = ?2)
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, status], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn update_profile(&self, id: Uuid, profile: Profile) -> Result<Option<Person>> {
    let id_str       = encode_uuid(id);
    let profile_json = encode_profile(&profile)?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons SET profile_json = ?1 WHERE person_id = ?2",
          rusqlite::params![profile_json, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_person(id).await
  }

  async fn set_application(
    &self,
    id: Uuid,
    application: OnboardingApplication,
    profile: Option<Profile>,
  ) -> Result<Option<Person>> {
    let id_str        = encode_uuid(id);
    let status        = application.status.as_ref().to_owned();
    let feedback      = application.feedback;
    let submitted_str = application.submitted_at.map(encode_dt);
    let reviewed_str  = application.reviewed_at.map(encode_dt);
    let profile_json  = profile.as_ref().map(encode_profile).transpose()?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons SET
             application_status   = ?1,
             application_feedback = ?2,
             submitted_at         = ?3,
             reviewed_at          = ?4,
             profile_json         = coalesce(?5, profile_json)
           WHERE person_id = ?6",
          rusqlite::params![
            status,
            feedback,
            submitted_str,
            reviewed_str,
            profile_json,
            id_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_person(id).await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    self.document_where("document_id = ?1", vec![encode_uuid(id)]).await
  }

  async fn find_document(
    &self,
    person_id: Uuid,
    doc_type: DocumentType,
  ) -> Result<Option<Document>> {
    self
      .document_where("person_id = ?1 AND doc_type = ?2", vec![
        encode_uuid(person_id),
        doc_type.as_ref().to_owned(),
      ])
      .await
  }

  async fn list_documents(&self, person_id: Uuid) -> Result<Vec<Document>> {
    let person_id_str = encode_uuid(person_id);

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE person_id = ?1
           ORDER BY uploaded_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![person_id_str], RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn upsert_document(&self, document: Document) -> Result<Document> {
    let person_id = document.person_id;
    let doc_type  = document.doc_type;

    let id_str        = encode_uuid(document.document_id);
    let person_id_str = encode_uuid(person_id);
    let doc_type_str  = doc_type.as_ref().to_owned();
    let status_str    = document.status.as_ref().to_owned();
    let uploaded_str  = encode_dt(document.uploaded_at);
    let reviewed_str  = document.reviewed_at.map(encode_dt);
    let Document { feedback, stored_name, original_name, content_type, .. } = document;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // The (person_id, doc_type) row keeps its original document_id.
        let updated = tx.execute(
          "UPDATE documents SET
             status        = ?1,
             feedback      = ?2,
             stored_name   = ?3,
             original_name = ?4,
             content_type  = ?5,
             uploaded_at   = ?6,
             reviewed_at   = ?7
           WHERE person_id = ?8 AND doc_type = ?9",
          rusqlite::params![
            status_str,
            feedback,
            stored_name,
            original_name,
            content_type,
            uploaded_str,
            reviewed_str,
            person_id_str,
            doc_type_str,
          ],
        )?;
        if updated == 0 {
          tx.execute(
            "INSERT INTO documents (
               document_id, person_id, doc_type, status, feedback, stored_name,
               original_name, content_type, uploaded_at, reviewed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
              id_str,
              person_id_str,
              doc_type_str,
              status_str,
              feedback,
              stored_name,
              original_name,
              content_type,
              uploaded_str,
              reviewed_str,
            ],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    self
      .find_document(person_id, doc_type)
      .await?
      .ok_or_else(|| crate::Error::Decode {
        column: "documents",
        value:  format!("row for {person_id}/{doc_type} vanished after upsert"),
      })
  }

  // ── Registration tokens ───────────────────────────────────────────────────

  async fn save_token(&self, token: RegistrationToken) -> Result<RegistrationToken> {
    let id_str      = encode_uuid(token.token_id);
    let email       = token.email.clone();
    let first_name  = token.first_name.clone();
    let last_name   = token.last_name.clone();
    let token_hash  = token.token_hash.clone();
    let issued_by   = token.issued_by.clone();
    let created_str = encode_dt(token.created_at);
    let expires_str = encode_dt(token.expires_at);
    let used_str    = token.used_at.map(encode_dt);
    let used_by_str = token.used_by.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO registration_tokens (
             token_id, email, first_name, last_name, token_hash,
             issued_by, created_at, expires_at, used_at, used_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT(token_id) DO UPDATE SET
             expires_at = excluded.expires_at,
             used_at    = excluded.used_at,
             used_by    = excluded.used_by",
          rusqlite::params![
            id_str,
            email,
            first_name,
            last_name,
            token_hash,
            issued_by,
            created_str,
            expires_str,
            used_str,
            used_by_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(token)
  }

  async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<RegistrationToken>> {
    let hash = token_hash.to_owned();

    let raw: Option<RawToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TOKEN_COLUMNS} FROM registration_tokens WHERE token_hash = ?1"
              ),
              rusqlite::params![hash],
              RawToken::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawToken::into_token).transpose()
  }

  async fn list_tokens(&self) -> Result<Vec<RegistrationToken>> {
    let raws: Vec<RawToken> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TOKEN_COLUMNS} FROM registration_tokens ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawToken::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawToken::into_token).collect()
  }
}
