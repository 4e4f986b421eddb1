//! # arbor-db
//!
//! Storage backends for the arbor note tree.
//!
//! This crate provides:
//! - Connection pool management
//! - Idempotent schema bootstrap
//! - Postgres implementations of every repository trait in `arbor-core`
//! - The erasure pass used by the background sweeper
//! - An in-memory store with identical semantics, for tests and embedding
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/arbor").await?;
//!     db.bootstrap().await?;
//!
//!     let repos = db.repositories();
//!     let root = repos.notes.get(&arbor_db::NoteId::root()).await?;
//!     println!("root present: {}", root.is_some());
//!     Ok(())
//! }
//! ```
pub mod attributes;
pub mod branches;
pub mod erasure;
pub mod memory;
pub mod notes;
pub mod pool;
mod rows;
pub mod revisions;
pub mod schema;

// Re-export core types
pub use arbor_core::*;

pub use attributes::PgAttributeRepository;
pub use branches::PgBranchRepository;
pub use erasure::PgErasureRepository;
pub use memory::MemoryStore;
pub use notes::{hash_content, PgNoteRepository};
pub use pool::{connect_pool, log_pool_metrics, PoolConfig};
pub use revisions::PgRevisionRepository;
pub use schema::apply_schema;

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

/// Postgres-backed store bundling a repository per entity.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Note rows and note content.
    pub notes: PgNoteRepository,
    /// Tree placements.
    pub branches: PgBranchRepository,
    /// Labels, relations and derived link attributes.
    pub attributes: PgAttributeRepository,
    /// Revision snapshots and their content.
    pub revisions: PgRevisionRepository,
    /// Bulk erasure of long-deleted notes.
    pub erasure: PgErasureRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            branches: PgBranchRepository::new(pool.clone()),
            attributes: PgAttributeRepository::new(pool.clone()),
            revisions: PgRevisionRepository::new(pool.clone()),
            erasure: PgErasureRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the pool configuration read from the environment.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = connect_pool(database_url, &PoolConfig::from_env()).await?;
        Ok(Self::new(pool))
    }

    /// Apply the schema and make sure the tree root exists.
    pub async fn bootstrap(&self) -> Result<()> {
        apply_schema(&self.pool).await?;

        if self.notes.get(&NoteId::root()).await?.is_none() {
            let (note, branch) = Note::root(Utc::now());
            self.notes.save(&note).await?;
            self.notes.save_content(&note.id, "").await?;
            self.branches.save(&branch).await?;
            info!(subsystem = "db", component = "schema", "Seeded tree root");
        }
        Ok(())
    }

    /// Repository handles for the mutation engine.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            notes: Arc::new(self.notes.clone()),
            branches: Arc::new(self.branches.clone()),
            attributes: Arc::new(self.attributes.clone()),
            revisions: Arc::new(self.revisions.clone()),
        }
    }

    /// Erasure handle for the sweeper.
    pub fn erasure(&self) -> Arc<dyn ErasureRepository> {
        Arc::new(self.erasure.clone())
    }
}
