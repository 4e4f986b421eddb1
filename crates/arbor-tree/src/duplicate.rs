//! Note duplication.

use tracing::{info, instrument};

use arbor_core::{
    defaults, to_local, Attribute, AttributeId, Branch, ContentAccess, Error, Lifecycle,
    LifecycleFilter, Note, NoteId, Result, TreeEvent,
};

use crate::NoteTree;

impl NoteTree {
    /// Copy a note, its content and its attributes under `parent_note_id`.
    ///
    /// The copy is placed right after the source when the source already
    /// sits under that parent, otherwise at the end.
    #[instrument(skip_all, fields(subsystem = "tree", op = "duplicate_note", note_id = %note_id, parent_note_id = %parent_note_id))]
    pub async fn duplicate_note(
        &self,
        note_id: &NoteId,
        parent_note_id: &NoteId,
        access: &ContentAccess,
    ) -> Result<(Note, Branch)> {
        let source = self
            .repos
            .notes
            .get(note_id)
            .await?
            .ok_or_else(|| Error::NoteNotFound(note_id.clone()))?;

        if !source.is_content_available(access) {
            return Err(Error::Unavailable(format!(
                "cannot duplicate protected note {} while the protected session is locked",
                note_id
            )));
        }

        let parent = self
            .repos
            .notes
            .get(parent_note_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| {
                Error::Validation(format!("Parent note '{}' does not exist", parent_note_id))
            })?;

        let content = self.load_note_content(&source, access).await?;

        let now = self.now();
        let local = to_local(now);
        let note = Note {
            id: NoteId::generate(),
            title: format!("{}{}", source.title, defaults::DUPLICATE_TITLE_SUFFIX),
            lifecycle: Lifecycle::Live,
            is_erased: false,
            content_length: content.len() as i64,
            date_created: local,
            date_modified: local,
            utc_date_created: now,
            utc_date_modified: now,
            ..source.clone()
        };
        self.repos.notes.save(&note).await?;
        self.write_note_content(&note, &content, access).await?;

        let source_branch = self
            .repos
            .branches
            .for_note(&source.id, LifecycleFilter::Live)
            .await?
            .into_iter()
            .find(|b| b.parent_note_id == parent.id);
        let position = match source_branch {
            Some(branch) => branch.position + defaults::DUPLICATE_POSITION_OFFSET,
            None => self.next_child_position(&parent.id).await?,
        };
        let branch = Branch::new(note.id.clone(), parent.id.clone(), position, now);
        self.repos.branches.save(&branch).await?;

        let attributes = self
            .repos
            .attributes
            .owned_by(&source.id, LifecycleFilter::Live)
            .await?;
        for attribute in attributes {
            let copy = Attribute {
                id: AttributeId::generate(),
                note_id: note.id.clone(),
                utc_date_modified: now,
                ..attribute
            };
            self.repos.attributes.save(&copy).await?;
        }

        self.events.emit(TreeEvent::ChildNoteCreated {
            child_note_id: note.id.clone(),
            parent_note_id: parent.id.clone(),
        });

        info!(duplicate_id = %note.id, position, "Note duplicated");
        Ok((note, branch))
    }
}
