//! Branch repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use arbor_core::{Branch, BranchId, BranchRepository, Error, LifecycleFilter, NoteId, Result};

use crate::rows::BranchRow;

/// SQL predicate for a lifecycle filter; `$2` binds the batch when needed.
pub(crate) fn lifecycle_clause(filter: &LifecycleFilter) -> &'static str {
    match filter {
        LifecycleFilter::Live => "AND is_deleted = FALSE",
        LifecycleFilter::DeletedIn(_) => "AND is_deleted = TRUE AND delete_id = $2",
        LifecycleFilter::Any => "",
    }
}

/// PostgreSQL implementation of BranchRepository.
#[derive(Clone)]
pub struct PgBranchRepository {
    pool: Pool<Postgres>,
}

impl PgBranchRepository {
    /// Create a new PgBranchRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_by(
        &self,
        column: &str,
        id: &NoteId,
        filter: &LifecycleFilter,
    ) -> Result<Vec<Branch>> {
        let sql = format!(
            "SELECT * FROM branches WHERE {} = $1 {} ORDER BY position, id",
            column,
            lifecycle_clause(filter)
        );

        let mut query = sqlx::query_as::<_, BranchRow>(&sql).bind(id.as_str());
        if let LifecycleFilter::DeletedIn(batch) = filter {
            query = query.bind(batch.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Branch::from).collect())
    }
}

#[async_trait]
impl BranchRepository for PgBranchRepository {
    async fn get(&self, id: &BranchId) -> Result<Option<Branch>> {
        let row: Option<BranchRow> = sqlx::query_as("SELECT * FROM branches WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Branch::from))
    }

    async fn save(&self, branch: &Branch) -> Result<()> {
        let (is_deleted, delete_id) = branch.lifecycle.to_columns();

        sqlx::query(
            r#"INSERT INTO branches (
                   id, note_id, parent_note_id, position, prefix, is_expanded,
                   is_deleted, delete_id, utc_date_modified
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (id) DO UPDATE SET
                   position = EXCLUDED.position,
                   prefix = EXCLUDED.prefix,
                   is_expanded = EXCLUDED.is_expanded,
                   is_deleted = EXCLUDED.is_deleted,
                   delete_id = EXCLUDED.delete_id,
                   utc_date_modified = EXCLUDED.utc_date_modified"#,
        )
        .bind(branch.id.as_str())
        .bind(branch.note_id.as_str())
        .bind(branch.parent_note_id.as_str())
        .bind(branch.position)
        .bind(&branch.prefix)
        .bind(branch.is_expanded)
        .bind(is_deleted)
        .bind(delete_id)
        .bind(branch.utc_date_modified)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn for_note(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Branch>> {
        self.fetch_by("note_id", note_id, &filter).await
    }

    async fn children_of(
        &self,
        parent_note_id: &NoteId,
        filter: LifecycleFilter,
    ) -> Result<Vec<Branch>> {
        self.fetch_by("parent_note_id", parent_note_id, &filter)
            .await
    }

    async fn max_child_position(&self, parent_note_id: &NoteId) -> Result<Option<i64>> {
        let (max,): (Option<i64>,) = sqlx::query_as(
            "SELECT MAX(position) FROM branches WHERE parent_note_id = $1 AND is_deleted = FALSE",
        )
        .bind(parent_note_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(max)
    }

    async fn shift_positions_after(
        &self,
        parent_note_id: &NoteId,
        after: i64,
        delta: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE branches SET position = position + $3
               WHERE parent_note_id = $1 AND position > $2 AND is_deleted = FALSE"#,
        )
        .bind(parent_note_id.as_str())
        .bind(after)
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }
}
