//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres};

use arbor_core::{Error, Note, NoteId, NoteRepository, Result};

use crate::rows::{format_local, NoteRow};

/// Compute the SHA-256 hash recorded next to stored content.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let row: Option<NoteRow> = sqlx::query_as("SELECT * FROM notes WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Note::try_from).transpose()
    }

    async fn save(&self, note: &Note) -> Result<()> {
        let (is_deleted, delete_id) = note.lifecycle.to_columns();

        sqlx::query(
            r#"INSERT INTO notes (
                   id, title, note_type, mime, is_protected, is_deleted, delete_id, is_erased,
                   content_length, date_created, date_modified, utc_date_created, utc_date_modified
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               ON CONFLICT (id) DO UPDATE SET
                   title = EXCLUDED.title,
                   note_type = EXCLUDED.note_type,
                   mime = EXCLUDED.mime,
                   is_protected = EXCLUDED.is_protected,
                   is_deleted = EXCLUDED.is_deleted,
                   delete_id = EXCLUDED.delete_id,
                   is_erased = EXCLUDED.is_erased,
                   content_length = EXCLUDED.content_length,
                   date_modified = EXCLUDED.date_modified,
                   utc_date_modified = EXCLUDED.utc_date_modified"#,
        )
        .bind(note.id.as_str())
        .bind(&note.title)
        .bind(note.note_type.as_str())
        .bind(&note.mime)
        .bind(note.is_protected)
        .bind(is_deleted)
        .bind(delete_id)
        .bind(note.is_erased)
        .bind(note.content_length)
        .bind(format_local(&note.date_created))
        .bind(format_local(&note.date_modified))
        .bind(note.utc_date_created)
        .bind(note.utc_date_modified)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn get_content(&self, id: &NoteId) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT content FROM note_contents WHERE note_id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(row.and_then(|(content,)| content))
    }

    async fn save_content(&self, id: &NoteId, content: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO note_contents (note_id, content, hash, utc_date_modified)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (note_id) DO UPDATE SET
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content_format() {
        let hash = hash_content("hello");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 64);
        assert_eq!(
            hash,
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_content_differs() {
        assert_ne!(hash_content("a"), hash_content("b"));
    }
}
