//! Revision repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use arbor_core::{Error, NoteId, Result, Revision, RevisionId, RevisionRepository};

use crate::notes::hash_content;
use crate::rows::{format_local, RevisionRow};

/// PostgreSQL implementation of RevisionRepository.
#[derive(Clone)]
pub struct PgRevisionRepository {
    pool: Pool<Postgres>,
}

impl PgRevisionRepository {
    /// Create a new PgRevisionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevisionRepository for PgRevisionRepository {
    async fn get(&self, id: &RevisionId) -> Result<Option<Revision>> {
        let row: Option<RevisionRow> = sqlx::query_as("SELECT * FROM revisions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Revision::try_from).transpose()
    }

    async fn save(&self, revision: &Revision) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO revisions (
                   id, note_id, title, note_type, mime, is_protected, is_erased, content_length,
                   date_last_edited, date_created, utc_date_last_edited, utc_date_created,
                   utc_date_modified
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               ON CONFLICT (id) DO UPDATE SET
                   title = EXCLUDED.title,
                   is_protected = EXCLUDED.is_protected,
                   is_erased = EXCLUDED.is_erased,
                   content_length = EXCLUDED.content_length,
                   utc_date_modified = EXCLUDED.utc_date_modified"#,
        )
        .bind(revision.id.as_str())
        .bind(revision.note_id.as_str())
        .bind(&revision.title)
        .bind(revision.note_type.as_str())
        .bind(&revision.mime)
        .bind(revision.is_protected)
        .bind(revision.is_erased)
        .bind(revision.content_length)
        .bind(format_local(&revision.date_last_edited))
        .bind(format_local(&revision.date_created))
        .bind(revision.utc_date_last_edited)
        .bind(revision.utc_date_created)
        .bind(revision.utc_date_modified)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn for_note(&self, note_id: &NoteId) -> Result<Vec<Revision>> {
        let rows: Vec<RevisionRow> = sqlx::query_as(
            "SELECT * FROM revisions WHERE note_id = $1 ORDER BY utc_date_created DESC, id DESC",
        )
        .bind(note_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Revision::try_from).collect()
    }

    async fn exists_since(&self, note_id: &NoteId, since: DateTime<Utc>) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM revisions WHERE note_id = $1 AND utc_date_created >= $2)",
        )
        .bind(note_id.as_str())
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(exists)
    }

    async fn get_content(&self, id: &RevisionId) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT content FROM revision_contents WHERE revision_id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(row.and_then(|(content,)| content))
    }

    async fn save_content(&self, id: &RevisionId, content: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO revision_contents (revision_id, content, hash, utc_date_modified)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (revision_id) DO UPDATE SET
                   content = EXCLUDED.content,
                   hash = EXCLUDED.hash,
                   utc_date_modified = EXCLUDED.utc_date_modified"#,
        )
        .bind(id.as_str())
        .bind(content)
        .bind(hash_content(content))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
