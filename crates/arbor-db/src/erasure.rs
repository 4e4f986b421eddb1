//! Permanent erasure of soft-deleted notes.
//!
//! Everything happens in one transaction: the candidate notes are locked,
//! their payloads are overwritten, then their revisions and attributes are
//! scrubbed. Rows are kept so references stay resolvable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::debug;

use arbor_core::{
    Error, ErasureRepository, NoteId, Result, ERASED_ATTRIBUTE_NAME, ERASED_NOTE_TITLE,
};

/// PostgreSQL implementation of ErasureRepository.
#[derive(Clone)]
pub struct PgErasureRepository {
    pool: Pool<Postgres>,
}

impl PgErasureRepository {
    /// Create a new PgErasureRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ErasureRepository for PgErasureRepository {
    async fn erase_deleted_notes(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NoteId>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let ids: Vec<String> = sqlx::query_scalar(
            r#"SELECT id FROM notes
               WHERE is_deleted = TRUE AND is_erased = FALSE AND utc_date_modified <= $1
               ORDER BY id
               FOR UPDATE"#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if ids.is_empty() {
            tx.commit().await.map_err(Error::Database)?;
            return Ok(Vec::new());
        }

        sqlx::query(
            r#"UPDATE notes
               SET title = $2, content_length = 0, is_protected = FALSE, is_erased = TRUE,
                   utc_date_modified = $3
               WHERE id = ANY($1)"#,
        )
        .bind(&ids)
        .bind(ERASED_NOTE_TITLE)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            r#"UPDATE note_contents SET content = NULL, hash = NULL, utc_date_modified = $2
               WHERE note_id = ANY($1)"#,
        )
        .bind(&ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query(
            r#"UPDATE revision_contents SET content = NULL, hash = NULL, utc_date_modified = $2
               WHERE revision_id IN (
                   SELECT id FROM revisions WHERE note_id = ANY($1) AND is_erased = FALSE
               )"#,
        )
        .bind(&ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let revisions = sqlx::query(
            r#"UPDATE revisions
               SET is_erased = TRUE, title = NULL, content_length = 0, utc_date_modified = $2
               WHERE note_id = ANY($1) AND is_erased = FALSE"#,
        )
        .bind(&ids)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let attributes = sqlx::query(
            r#"UPDATE attributes
               SET name = $2, value = '', is_erased = TRUE, utc_date_modified = $3
               WHERE note_id = ANY($1) AND is_erased = FALSE"#,
        )
        .bind(&ids)
        .bind(ERASED_ATTRIBUTE_NAME)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "erasure",
            result_count = ids.len(),
            revisions = revisions.rows_affected(),
            attributes = attributes.rows_affected(),
            "Erased deleted notes"
        );

        Ok(ids.into_iter().map(NoteId::from).collect())
    }
}
