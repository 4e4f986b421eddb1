//! Table definitions for the Postgres store.
//!
//! Statements are idempotent so the bootstrap can run on every start.
//! Local timestamps are kept as RFC 3339 text to preserve the offset they
//! were recorded with.

use sqlx::PgPool;
use tracing::info;

use arbor_core::{Error, Result};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id                  TEXT PRIMARY KEY,
    title               TEXT NOT NULL,
    note_type           TEXT NOT NULL,
    mime                TEXT NOT NULL,
    is_protected        BOOLEAN NOT NULL DEFAULT FALSE,
    is_deleted          BOOLEAN NOT NULL DEFAULT FALSE,
    delete_id           TEXT,
    is_erased           BOOLEAN NOT NULL DEFAULT FALSE,
    content_length      BIGINT NOT NULL DEFAULT 0,
    date_created        TEXT NOT NULL,
    date_modified       TEXT NOT NULL,
    utc_date_created    TIMESTAMPTZ NOT NULL,
    utc_date_modified   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_erasure
    ON notes (utc_date_modified) WHERE is_deleted AND NOT is_erased;

CREATE TABLE IF NOT EXISTS note_contents (
    note_id             TEXT PRIMARY KEY REFERENCES notes (id),
    content             TEXT,
    hash                TEXT,
    utc_date_modified   TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS branches (
    id                  TEXT PRIMARY KEY,
    note_id             TEXT NOT NULL,
    parent_note_id      TEXT NOT NULL,
    position            BIGINT NOT NULL,
    prefix              TEXT,
    is_expanded         BOOLEAN NOT NULL DEFAULT FALSE,
    is_deleted          BOOLEAN NOT NULL DEFAULT FALSE,
    delete_id           TEXT,
    utc_date_modified   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_branches_note ON branches (note_id);
CREATE INDEX IF NOT EXISTS idx_branches_parent ON branches (parent_note_id, position);

CREATE TABLE IF NOT EXISTS attributes (
    id                  TEXT PRIMARY KEY,
    note_id             TEXT NOT NULL,
    attribute_type      TEXT NOT NULL,
    name                TEXT NOT NULL,
    value               TEXT NOT NULL DEFAULT '',
    position            BIGINT NOT NULL DEFAULT 0,
    is_inheritable      BOOLEAN NOT NULL DEFAULT FALSE,
    is_deleted          BOOLEAN NOT NULL DEFAULT FALSE,
    delete_id           TEXT,
    is_erased           BOOLEAN NOT NULL DEFAULT FALSE,
    utc_date_modified   TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attributes_note ON attributes (note_id);
CREATE INDEX IF NOT EXISTS idx_attributes_value
    ON attributes (value) WHERE attribute_type = 'relation';

CREATE TABLE IF NOT EXISTS revisions (
    id                      TEXT PRIMARY KEY,
    note_id                 TEXT NOT NULL,
    title                   TEXT,
    note_type               TEXT NOT NULL,
    mime                    TEXT NOT NULL,
    is_protected            BOOLEAN NOT NULL DEFAULT FALSE,
    is_erased               BOOLEAN NOT NULL DEFAULT FALSE,
    content_length          BIGINT NOT NULL DEFAULT 0,
    date_last_edited        TEXT NOT NULL,
    date_created            TEXT NOT NULL,
    utc_date_last_edited    TIMESTAMPTZ NOT NULL,
    utc_date_created        TIMESTAMPTZ NOT NULL,
    utc_date_modified       TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_revisions_note ON revisions (note_id, utc_date_created);

CREATE TABLE IF NOT EXISTS revision_contents (
    revision_id         TEXT PRIMARY KEY REFERENCES revisions (id),
    content             TEXT,
    hash                TEXT,
    utc_date_modified   TIMESTAMPTZ NOT NULL
);
"#;

/// Create the tables and indexes when missing.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    info!(subsystem = "db", component = "schema", "Schema ready");
    Ok(())
}
