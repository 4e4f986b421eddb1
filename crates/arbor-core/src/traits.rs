//! Core traits for arbor abstractions.
//!
//! These traits define the interfaces that storage backends and host
//! applications must satisfy. The mutation engine only talks to these
//! traits, so it runs unchanged against Postgres or the in-memory store.
//!
//! Saves are upserts with mutate-then-save semantics. No transactional
//! grouping across calls is assumed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// Persistence of notes and their content rows.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Fetch a note by id, deleted or not.
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Insert or update a note row.
    async fn save(&self, note: &Note) -> Result<()>;

    /// Stored content (ciphertext for protected notes). `None` when the
    /// note has no content row or the content was erased.
    async fn get_content(&self, id: &NoteId) -> Result<Option<String>>;

    /// Insert or replace the stored content of a note.
    async fn save_content(&self, id: &NoteId, content: &str) -> Result<()>;
}

/// Persistence of branches.
#[async_trait]
pub trait BranchRepository: Send + Sync {
    async fn get(&self, id: &BranchId) -> Result<Option<Branch>>;

    async fn save(&self, branch: &Branch) -> Result<()>;

    /// Branches placing `note_id`, ordered by position.
    async fn for_note(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Branch>>;

    /// Branches placed under `parent_note_id`, ordered by position.
    async fn children_of(
        &self,
        parent_note_id: &NoteId,
        filter: LifecycleFilter,
    ) -> Result<Vec<Branch>>;

    /// Highest position among live branches under the parent.
    async fn max_child_position(&self, parent_note_id: &NoteId) -> Result<Option<i64>>;

    /// Add `delta` to the position of every live branch under the parent
    /// whose position is strictly greater than `after`.
    ///
    /// Modification timestamps are left untouched. Returns the number of
    /// branches moved.
    async fn shift_positions_after(
        &self,
        parent_note_id: &NoteId,
        after: i64,
        delta: i64,
    ) -> Result<u64>;
}

/// Persistence of labels and relations.
#[async_trait]
pub trait AttributeRepository: Send + Sync {
    async fn get(&self, id: &AttributeId) -> Result<Option<Attribute>>;

    async fn save(&self, attribute: &Attribute) -> Result<()>;

    /// Attributes owned by the note, ordered by position.
    async fn owned_by(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Attribute>>;

    /// Relations of other notes whose value is `note_id`.
    async fn targeting(&self, note_id: &NoteId, filter: LifecycleFilter)
        -> Result<Vec<Attribute>>;
}

/// Persistence of revisions and their content rows.
#[async_trait]
pub trait RevisionRepository: Send + Sync {
    async fn get(&self, id: &RevisionId) -> Result<Option<Revision>>;

    async fn save(&self, revision: &Revision) -> Result<()>;

    /// Revisions of a note, newest first.
    async fn for_note(&self, note_id: &NoteId) -> Result<Vec<Revision>>;

    /// Whether any revision of the note was created at or after `since`.
    async fn exists_since(&self, note_id: &NoteId, since: DateTime<Utc>) -> Result<bool>;

    async fn get_content(&self, id: &RevisionId) -> Result<Option<String>>;

    async fn save_content(&self, id: &RevisionId, content: &str) -> Result<()>;
}

/// Bulk purge that bypasses the per-entity save path.
///
/// Runs identically on every replica, so it records nothing for
/// replication and performs no protection checks.
#[async_trait]
pub trait ErasureRepository: Send + Sync {
    /// Erase every soft-deleted, not-yet-erased note whose
    /// `utc_date_modified` is at or before `cutoff`, together with its
    /// content, its revisions and its attributes. Scrubbed rows are stamped
    /// with `now`. Returns the erased ids.
    async fn erase_deleted_notes(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NoteId>>;
}

/// The repositories the mutation engine works against.
#[derive(Clone)]
pub struct Repositories {
    pub notes: Arc<dyn NoteRepository>,
    pub branches: Arc<dyn BranchRepository>,
    pub attributes: Arc<dyn AttributeRepository>,
    pub revisions: Arc<dyn RevisionRepository>,
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Host-provided options consumed by the engine.
///
/// Each value is read once per operation that needs it; there is no
/// live-reload contract.
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Minimum time between automatic revision snapshots of a note.
    async fn revision_snapshot_interval(&self) -> Result<Duration>;

    /// Time a note stays soft-deleted before it is erased.
    async fn erasure_retention(&self) -> Result<Duration>;

    /// Note currently hoisted in the UI; it cannot be deleted.
    async fn hoisted_note_id(&self) -> Result<NoteId>;
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Receives one tick per entity processed by a long-running cascade.
pub trait ProgressSink: Send + Sync {
    fn increase_progress_count(&self);
}

/// Progress sink that discards ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn increase_progress_count(&self) {}
}
