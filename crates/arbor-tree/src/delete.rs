//! Cascading soft-delete and undelete.
//!
//! Every entity flipped by one delete carries the same [`DeleteBatch`];
//! undelete restores only entities carrying that batch, so a note deleted
//! by an earlier, unrelated delete stays deleted. Cascades are depth-first:
//! children are deleted before their note, and restored after it.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use arbor_core::{
    Attribute, AttributeId, Branch, BranchId, DeleteBatch, Error, Lifecycle, LifecycleFilter,
    NoteId, ProgressSink, Result,
};

use crate::{BoxFuture, NoteTree};

fn dedup_by_id(attributes: Vec<Attribute>) -> Vec<Attribute> {
    let mut seen: HashSet<AttributeId> = HashSet::new();
    attributes
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}

impl NoteTree {
    /// Soft-delete a branch under `batch`.
    ///
    /// When it was the note's last live branch the note goes too, together
    /// with its subtree, its attributes and the relations pointing at it.
    /// Returns whether the note itself was deleted.
    #[instrument(skip_all, fields(subsystem = "tree", op = "delete_branch", branch_id = %branch_id, delete_id = %batch))]
    pub async fn delete_branch(
        &self,
        branch_id: &BranchId,
        batch: &DeleteBatch,
        progress: &dyn ProgressSink,
    ) -> Result<bool> {
        let hoisted = self.options.hoisted_note_id().await?;
        let deleted = self
            .delete_branch_cascade(branch_id.clone(), batch, progress, &hoisted)
            .await?;
        info!(note_deleted = deleted, "Branch deleted");
        Ok(deleted)
    }

    fn delete_branch_cascade<'a>(
        &'a self,
        branch_id: BranchId,
        batch: &'a DeleteBatch,
        progress: &'a dyn ProgressSink,
        hoisted: &'a NoteId,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let Some(mut branch) = self.repos.branches.get(&branch_id).await? else {
                return Ok(false);
            };
            if branch.is_deleted() {
                return Ok(false);
            }
            if branch.is_root() {
                return Err(Error::StructuralProtection(
                    "the root note cannot be deleted".into(),
                ));
            }
            if &branch.note_id == hoisted {
                return Err(Error::StructuralProtection(format!(
                    "hoisted note {} cannot be deleted",
                    hoisted
                )));
            }
            progress.increase_progress_count();

            let now = self.now();
            branch.lifecycle = Lifecycle::Deleted(Some(batch.clone()));
            branch.utc_date_modified = now;
            self.repos.branches.save(&branch).await?;

            let remaining = self
                .repos
                .branches
                .for_note(&branch.note_id, LifecycleFilter::Live)
                .await?;
            if !remaining.is_empty() {
                debug!(note_id = %branch.note_id, remaining = remaining.len(), "Note kept by other parents");
                return Ok(false);
            }

            let mut note = self
                .repos
                .notes
                .get(&branch.note_id)
                .await?
                .ok_or_else(|| Error::NoteNotFound(branch.note_id.clone()))?;

            let children = self
                .repos
                .branches
                .children_of(&note.id, LifecycleFilter::Live)
                .await?;
            for child in children {
                self.delete_branch_cascade(child.id, batch, progress, hoisted)
                    .await?;
            }

            note.lifecycle = Lifecycle::Deleted(Some(batch.clone()));
            note.touch(self.now());
            self.repos.notes.save(&note).await?;

            let mut attributes = self
                .repos
                .attributes
                .owned_by(&note.id, LifecycleFilter::Live)
                .await?;
            attributes.extend(
                self.repos
                    .attributes
                    .targeting(&note.id, LifecycleFilter::Live)
                    .await?,
            );
            for mut attribute in dedup_by_id(attributes) {
                attribute.lifecycle = Lifecycle::Deleted(Some(batch.clone()));
                attribute.utc_date_modified = self.now();
                self.repos.attributes.save(&attribute).await?;
            }

            debug!(note_id = %note.id, "Note deleted");
            Ok(true)
        })
    }

    /// Restore what `batch` deleted, starting from `note_id`.
    ///
    /// Only branches whose parent note is alive are restored; with none the
    /// call does nothing.
    #[instrument(skip_all, fields(subsystem = "tree", op = "undelete_note", note_id = %note_id, delete_id = %batch))]
    pub async fn undelete_note(
        &self,
        note_id: &NoteId,
        batch: &DeleteBatch,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let deleted = self
            .repos
            .branches
            .for_note(note_id, LifecycleFilter::DeletedIn(batch.clone()))
            .await?;

        let mut candidates = Vec::new();
        for branch in deleted {
            let parent = self.repos.notes.get(&branch.parent_note_id).await?;
            if parent.is_some_and(|p| !p.is_deleted()) {
                candidates.push(branch);
            }
        }

        if candidates.is_empty() {
            debug!("No restorable branch for batch");
            return Ok(());
        }

        for branch in candidates {
            self.undelete_branch_cascade(branch, batch, progress)
                .await?;
        }
        info!("Note undeleted");
        Ok(())
    }

    fn undelete_branch_cascade<'a>(
        &'a self,
        mut branch: Branch,
        batch: &'a DeleteBatch,
        progress: &'a dyn ProgressSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !branch.is_deleted() {
                return Ok(());
            }

            let mut note = self
                .repos
                .notes
                .get(&branch.note_id)
                .await?
                .ok_or_else(|| Error::NoteNotFound(branch.note_id.clone()))?;

            // A note removed by another delete stays removed.
            if note.is_deleted() && !note.lifecycle.deleted_in(batch) {
                return Ok(());
            }

            branch.lifecycle = Lifecycle::Live;
            branch.utc_date_modified = self.now();
            self.repos.branches.save(&branch).await?;
            progress.increase_progress_count();

            if !note.lifecycle.deleted_in(batch) {
                return Ok(());
            }

            note.lifecycle = Lifecycle::Live;
            note.touch(self.now());
            self.repos.notes.save(&note).await?;

            let filter = LifecycleFilter::DeletedIn(batch.clone());
            let mut attributes = self
                .repos
                .attributes
                .owned_by(&note.id, filter.clone())
                .await?;
            attributes.extend(
                self.repos
                    .attributes
                    .targeting(&note.id, filter.clone())
                    .await?,
            );
            for mut attribute in dedup_by_id(attributes) {
                attribute.lifecycle = Lifecycle::Live;
                attribute.utc_date_modified = self.now();
                self.repos.attributes.save(&attribute).await?;
            }

            let children = self.repos.branches.children_of(&note.id, filter).await?;
            for child in children {
                self.undelete_branch_cascade(child, batch, progress)
                    .await?;
            }

            debug!(note_id = %note.id, "Note restored");
            Ok(())
        })
    }
}
