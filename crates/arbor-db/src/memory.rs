//! In-memory backend of the repository traits.
//!
//! Used by tests and embedded hosts. Semantics match the Postgres store,
//! including ordering, lifecycle filtering and the erasure pass. Every
//! mutating call bumps a write counter so callers can assert that an
//! operation performed no writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use arbor_core::{
    Attribute, AttributeId, AttributeRepository, AttributeType, Branch, BranchId,
    BranchRepository, ErasureRepository, LifecycleFilter, Note, NoteId, NoteRepository,
    Repositories, Result, Revision, RevisionId, RevisionRepository, ERASED_ATTRIBUTE_NAME,
    ERASED_NOTE_TITLE,
};

#[derive(Default)]
struct Tables {
    notes: HashMap<NoteId, Note>,
    note_contents: HashMap<NoteId, Option<String>>,
    branches: HashMap<BranchId, Branch>,
    attributes: HashMap<AttributeId, Attribute>,
    revisions: HashMap<RevisionId, Revision>,
    revision_contents: HashMap<RevisionId, Option<String>>,
}

/// Shared in-memory store; clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the tree root.
    pub async fn with_root(now: DateTime<Utc>) -> Self {
        let store = Self::new();
        let (note, branch) = Note::root(now);
        {
            let mut tables = store.tables.write().await;
            tables.notes.insert(note.id.clone(), note.clone());
            tables.note_contents.insert(note.id, Some(String::new()));
            tables.branches.insert(branch.id.clone(), branch);
        }
        store
    }

    /// Number of mutating calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Bundle this store behind the engine's repository handles.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            notes: Arc::new(self.clone()),
            branches: Arc::new(self.clone()),
            attributes: Arc::new(self.clone()),
            revisions: Arc::new(self.clone()),
        }
    }

    /// Raw stored note content, bypassing any decryption.
    pub async fn raw_note_content(&self, id: &NoteId) -> Option<String> {
        self.tables
            .read()
            .await
            .note_contents
            .get(id)
            .cloned()
            .flatten()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn sorted_branches(mut branches: Vec<Branch>) -> Vec<Branch> {
    branches.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
    branches
}

fn sorted_attributes(mut attributes: Vec<Attribute>) -> Vec<Attribute> {
    attributes.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
    attributes
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        Ok(self.tables.read().await.notes.get(id).cloned())
    }

    async fn save(&self, note: &Note) -> Result<()> {
        self.tables
            .write()
            .await
            .notes
            .insert(note.id.clone(), note.clone());
        self.record_write();
        Ok(())
    }

    async fn get_content(&self, id: &NoteId) -> Result<Option<String>> {
        Ok(self.raw_note_content(id).await)
    }

    async fn save_content(&self, id: &NoteId, content: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .note_contents
            .insert(id.clone(), Some(content.to_string()));
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl BranchRepository for MemoryStore {
    async fn get(&self, id: &BranchId) -> Result<Option<Branch>> {
        Ok(self.tables.read().await.branches.get(id).cloned())
    }

    async fn save(&self, branch: &Branch) -> Result<()> {
        self.tables
            .write()
            .await
            .branches
            .insert(branch.id.clone(), branch.clone());
        self.record_write();
        Ok(())
    }

    async fn for_note(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Branch>> {
        let tables = self.tables.read().await;
        Ok(sorted_branches(
            tables
                .branches
                .values()
                .filter(|b| &b.note_id == note_id && filter.matches(&b.lifecycle))
                .cloned()
                .collect(),
        ))
    }

    async fn children_of(
        &self,
        parent_note_id: &NoteId,
        filter: LifecycleFilter,
    ) -> Result<Vec<Branch>> {
        let tables = self.tables.read().await;
        Ok(sorted_branches(
            tables
                .branches
                .values()
                .filter(|b| &b.parent_note_id == parent_note_id && filter.matches(&b.lifecycle))
                .cloned()
                .collect(),
        ))
    }

    async fn max_child_position(&self, parent_note_id: &NoteId) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .branches
            .values()
            .filter(|b| &b.parent_note_id == parent_note_id && b.lifecycle.is_live())
            .map(|b| b.position)
            .max())
    }

    async fn shift_positions_after(
        &self,
        parent_note_id: &NoteId,
        after: i64,
        delta: i64,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut shifted = 0;
        for branch in tables.branches.values_mut() {
            if &branch.parent_note_id == parent_note_id
                && branch.lifecycle.is_live()
                && branch.position > after
            {
                branch.position += delta;
                shifted += 1;
            }
        }
        drop(tables);
        self.record_write();
        Ok(shifted)
    }
}

#[async_trait]
impl AttributeRepository for MemoryStore {
    async fn get(&self, id: &AttributeId) -> Result<Option<Attribute>> {
        Ok(self.tables.read().await.attributes.get(id).cloned())
    }

    async fn save(&self, attribute: &Attribute) -> Result<()> {
        self.tables
            .write()
            .await
            .attributes
            .insert(attribute.id.clone(), attribute.clone());
        self.record_write();
        Ok(())
    }

    async fn owned_by(&self, note_id: &NoteId, filter: LifecycleFilter) -> Result<Vec<Attribute>> {
        let tables = self.tables.read().await;
        Ok(sorted_attributes(
            tables
                .attributes
                .values()
                .filter(|a| &a.note_id == note_id && filter.matches(&a.lifecycle))
                .cloned()
                .collect(),
        ))
    }

    async fn targeting(
        &self,
        note_id: &NoteId,
        filter: LifecycleFilter,
    ) -> Result<Vec<Attribute>> {
        let tables = self.tables.read().await;
        Ok(sorted_attributes(
            tables
                .attributes
                .values()
                .filter(|a| a.targets(note_id) && filter.matches(&a.lifecycle))
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl RevisionRepository for MemoryStore {
    async fn get(&self, id: &RevisionId) -> Result<Option<Revision>> {
        Ok(self.tables.read().await.revisions.get(id).cloned())
    }

    async fn save(&self, revision: &Revision) -> Result<()> {
        self.tables
            .write()
            .await
            .revisions
            .insert(revision.id.clone(), revision.clone());
        self.record_write();
        Ok(())
    }

    async fn for_note(&self, note_id: &NoteId) -> Result<Vec<Revision>> {
        let tables = self.tables.read().await;
        let mut revisions: Vec<Revision> = tables
            .revisions
            .values()
            .filter(|r| &r.note_id == note_id)
            .cloned()
            .collect();
        revisions.sort_by(|a, b| {
            b.utc_date_created
                .cmp(&a.utc_date_created)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(revisions)
    }

    async fn exists_since(&self, note_id: &NoteId, since: DateTime<Utc>) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .revisions
            .values()
            .any(|r| &r.note_id == note_id && r.utc_date_created >= since))
    }

    async fn get_content(&self, id: &RevisionId) -> Result<Option<String>> {
        Ok(self
            .tables
            .read()
            .await
            .revision_contents
            .get(id)
            .cloned()
            .flatten())
    }

    async fn save_content(&self, id: &RevisionId, content: &str) -> Result<()> {
        self.tables
            .write()
            .await
            .revision_contents
            .insert(id.clone(), Some(content.to_string()));
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl ErasureRepository for MemoryStore {
    async fn erase_deleted_notes(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NoteId>> {
        let mut tables = self.tables.write().await;

        let mut ids: Vec<NoteId> = tables
            .notes
            .values()
            .filter(|n| n.is_deleted() && !n.is_erased && n.utc_date_modified <= cutoff)
            .map(|n| n.id.clone())
            .collect();
        ids.sort();

        if ids.is_empty() {
            return Ok(ids);
        }

        let Tables {
            notes,
            note_contents,
            attributes,
            revisions,
            revision_contents,
            ..
        } = &mut *tables;

        for id in &ids {
            if let Some(note) = notes.get_mut(id) {
                note.title = ERASED_NOTE_TITLE.to_string();
                note.content_length = 0;
                note.is_protected = false;
                note.is_erased = true;
                note.utc_date_modified = now;
            }
            if let Some(content) = note_contents.get_mut(id) {
                *content = None;
            }
        }

        for revision in revisions
            .values_mut()
            .filter(|r| ids.contains(&r.note_id) && !r.is_erased)
        {
            if let Some(content) = revision_contents.get_mut(&revision.id) {
                *content = None;
            }
            revision.is_erased = true;
            revision.title = None;
            revision.content_length = 0;
            revision.utc_date_modified = now;
        }

        for attribute in attributes
            .values_mut()
            .filter(|a| ids.contains(&a.note_id) && !a.is_erased)
        {
            attribute.name = ERASED_ATTRIBUTE_NAME.to_string();
            attribute.value = String::new();
            attribute.is_erased = true;
            attribute.utc_date_modified = now;
        }

        drop(tables);
        self.record_write();
        Ok(ids)
    }
}
