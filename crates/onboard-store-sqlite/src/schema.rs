//! SQL schema for the onboarding SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    person_id            TEXT PRIMARY KEY,
    username             TEXT NOT NULL UNIQUE,
    email                TEXT NOT NULL UNIQUE,
    password_hash        TEXT NOT NULL,
    created_at           TEXT NOT NULL,
    invited_first_name   TEXT NOT NULL,
    invited_last_name    TEXT NOT NULL,
    profile_json         TEXT,            -- JSON-encoded Profile or NULL
    application_status   TEXT NOT NULL DEFAULT 'never_submitted',
    application_feedback TEXT,
    submitted_at         TEXT,
    reviewed_at          TEXT
);

-- At most one document per (person, type); re-uploads overwrite the row.
CREATE TABLE IF NOT EXISTS documents (
    document_id   TEXT PRIMARY KEY,
    person_id     TEXT NOT NULL REFERENCES persons(person_id),
    doc_type      TEXT NOT NULL,
    status        TEXT NOT NULL,    -- 'pending' | 'approved' | 'rejected'
    feedback      TEXT,
    stored_name   TEXT NOT NULL,
    original_name TEXT NOT NULL,
    content_type  TEXT NOT NULL,
    uploaded_at   TEXT NOT NULL,
    reviewed_at   TEXT,
    UNIQUE (person_id, doc_type),
    CHECK  (status != 'not_uploaded')
);

CREATE TABLE IF NOT EXISTS registration_tokens (
    token_id   TEXT PRIMARY KEY,
    email      TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name  TEXT NOT NULL,
    token_hash TEXT NOT NULL UNIQUE,  -- SHA-256 hex of the secret
    issued_by  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    used_at    TEXT,
    used_by    TEXT REFERENCES persons(person_id)
);

CREATE INDEX IF NOT EXISTS documents_person_idx ON documents(person_id);
CREATE INDEX IF NOT EXISTS persons_status_idx   ON persons(application_status);
CREATE INDEX IF NOT EXISTS tokens_email_idx     ON registration_tokens(email);

PRAGMA user_version = 1;
";
