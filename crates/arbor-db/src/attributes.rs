//! Attribute repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use arbor_core::{
    Attribute, AttributeId, AttributeRepository, Error, LifecycleFilter, NoteId, Result,
};

use crate::branches::lifecycle_clause;
use crate::rows::AttributeRow;

/// PostgreSQL implementation of AttributeRepository.
#[derive(Clone)]
pub struct PgAttributeRepository {
    pool: Pool<Postgres>,
}

impl PgAttributeRepository {
    /// Create a new PgAttributeRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        predicate: &str,
        note_id: &NoteId,
        filter: &LifecycleFilter,
    ) -> Result<Vec<Attribute>> {
        let sql = format!(
            "SELECT * FROM attributes WHERE {} {} ORDER BY position, id",
            predicate,
            lifecycle_clause(filter)
        );

        let mut query = sqlx::query_as::<_, AttributeRow>(&sql).bind(note_id.as_str());
        if let LifecycleFilter::DeletedIn(batch) = filter {
            query = query.bind(batch.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter().map(Attribute::try_from).collect()
    }
}

#[async_trait]
impl AttributeRepository for PgAttributeRepository {
    async fn get(&self, id: &AttributeId) -> Result<Option<Attribute>> {
        let row: Option<AttributeRow> = sqlx::query_as("SELECT * FROM attributes WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Attribute::try_from).transpose()
    }

    async fn save(&self, attribute: &Attribute) -> Result<()> {
        let (is_deleted, delete_id) = attribute.lifecycle.to_columns();

        sqlx::query(
            r#"INSERT INTO attributes (
                   id, note_id, attribute_type, name, value, position, is_inheritable,
                   is_deleted, delete_id, is_erased, utc_date_modified
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT (id) DO UPDATE SET
                   name = EXCLUDED.name,
                   value = EXCLUDED.value,
                   position = EXCLUDED.position,
                   is_inheritable = EXCLUDED.is_inheritable,
                   is_deleted = EXCLUDED.is_deleted,
                   delete_id = EXCLUDED.delete_id,
                   is_erased = EXCLUDED.is_erased,
                   utc_date_modified = EXCLUDED.utc_date_modified"#,
        )
        .bind(attribute.id.as_str())
        .bind(attribute.note_id.as_str())
        .bind(attribute.attribute_type.as_str())
        .bind(&attribute.name)
        .bind(&attribute.value)
        .bind(attribute.position)
        .bind(attribute.is_inheritable)
        .bind(is_deleted)
        .bind(delete_id)
        .bind(attribute.is_erased)
        .bind(attribute.utc_date_modified)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn owned_by(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Attribute>> {
        self.fetch("note_id = $1", note_id, &filter).await
    }

    async fn targeting(
        &self,
        note_id: &NoteId,
        filter: LifecycleFilter,
    ) -> Result<Vec<Attribute>> {
        self.fetch(
            "attribute_type = 'relation' AND value = $1",
            note_id,
            &filter,
        )
        .await
    }
}
