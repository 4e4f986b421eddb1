//! Revision snapshots.
//!
//! A snapshot is taken before an update when the note has not been
//! snapshotted within the configured interval and is itself older than
//! that interval. Binary notes and notes labelled `disableVersioning` are
//! never snapshotted.

use tracing::{debug, instrument};

use arbor_core::{
    to_local, AttributeType, ContentAccess, LifecycleFilter, Note, NoteId, Result, Revision,
    RevisionId, DISABLE_VERSIONING_LABEL,
};

use crate::NoteTree;

impl NoteTree {
    /// Revisions of a note, newest first.
    pub async fn note_revisions(&self, note_id: &NoteId) -> Result<Vec<Revision>> {
        self.repos.revisions.for_note(note_id).await
    }

    async fn has_versioning_disabled(&self, note: &Note) -> Result<bool> {
        let attributes = self
            .repos
            .attributes
            .owned_by(&note.id, LifecycleFilter::Live)
            .await?;
        Ok(attributes.iter().any(|a| {
            a.attribute_type == AttributeType::Label && a.name == DISABLE_VERSIONING_LABEL
        }))
    }

    /// Capture `note` as it is now when the snapshot policy asks for it.
    #[instrument(skip_all, fields(subsystem = "tree", op = "save_revision", note_id = %note.id))]
    pub(crate) async fn save_revision_if_needed(
        &self,
        note: &Note,
        access: &ContentAccess,
    ) -> Result<Option<Revision>> {
        if note.note_type.is_versioned_separately() || self.has_versioning_disabled(note).await? {
            return Ok(None);
        }

        let interval = self.options.revision_snapshot_interval().await?;
        let now = self.now();

        if now - note.utc_date_created < interval {
            return Ok(None);
        }
        if self
            .repos
            .revisions
            .exists_since(&note.id, now - interval)
            .await?
        {
            return Ok(None);
        }

        let content = self.load_note_content(note, access).await?;
        let revision = Revision {
            id: RevisionId::generate(),
            note_id: note.id.clone(),
            title: Some(note.title.clone()),
            note_type: note.note_type,
            mime: note.mime.clone(),
            is_protected: false,
            is_erased: false,
            content_length: content.len() as i64,
            date_last_edited: note.date_modified,
            date_created: to_local(now),
            utc_date_last_edited: note.utc_date_modified,
            utc_date_created: now,
            utc_date_modified: now,
        };
        self.repos.revisions.save(&revision).await?;
        self.write_revision_content(&revision, &content, access)
            .await?;

        debug!(revision_id = %revision.id, "Revision snapshot saved");

        self.protect_revisions(note, access).await?;
        Ok(Some(revision))
    }

    /// Bring every revision's protection in line with its note.
    pub(crate) async fn protect_revisions(&self, note: &Note, access: &ContentAccess) -> Result<()> {
        for mut revision in self.repos.revisions.for_note(&note.id).await? {
            if revision.is_erased || revision.is_protected == note.is_protected {
                continue;
            }

            let content = self.load_revision_content(&revision, access).await?;
            revision.is_protected = note.is_protected;
            revision.utc_date_modified = self.now();
            self.write_revision_content(&revision, &content, access)
                .await?;
            self.repos.revisions.save(&revision).await?;
        }
        Ok(())
    }
}
