//! Toggling note protection.

use tracing::{debug, instrument};

use arbor_core::{ContentAccess, Error, LifecycleFilter, NoteId, ProgressSink, Result};

use crate::{BoxFuture, NoteTree};

impl NoteTree {
    /// Protect or unprotect a note, optionally with its whole live subtree.
    ///
    /// Content and revisions are re-stored under the new mode. Requires an
    /// unlocked protected session in both directions.
    #[instrument(skip_all, fields(subsystem = "tree", op = "protect_note", note_id = %note_id, protect = protect))]
    pub async fn protect_note_recursively(
        &self,
        note_id: &NoteId,
        protect: bool,
        including_sub_tree: bool,
        access: &ContentAccess,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        if !access.is_accessible() {
            return Err(Error::Unavailable(
                "changing protection requires an open protected session".into(),
            ));
        }
        self.protect_cascade(note_id.clone(), protect, including_sub_tree, access, progress)
            .await
    }

    fn protect_cascade<'a>(
        &'a self,
        note_id: NoteId,
        protect: bool,
        including_sub_tree: bool,
        access: &'a ContentAccess,
        progress: &'a dyn ProgressSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut note = self
                .repos
                .notes
                .get(&note_id)
                .await?
                .ok_or_else(|| Error::NoteNotFound(note_id.clone()))?;

            if note.is_protected != protect {
                let content = self.load_note_content(&note, access).await?;
                note.is_protected = protect;
                note.content_length = content.len() as i64;
                note.touch(self.now());
                self.repos.notes.save(&note).await?;
                self.write_note_content(&note, &content, access).await?;
                self.protect_revisions(&note, access).await?;
                debug!(note_id = %note.id, protect, "Protection changed");
            }
            progress.increase_progress_count();

            if including_sub_tree {
                let children = self
                    .repos
                    .branches
                    .children_of(&note.id, LifecycleFilter::Live)
                    .await?;
                for child in children {
                    self.protect_cascade(child.note_id, protect, true, access, progress)
                        .await?;
                }
            }
            Ok(())
        })
    }
}
