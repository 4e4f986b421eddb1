//! Note updates.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, instrument};

use arbor_core::{ContentAccess, Error, NoteId, Result, TreeEvent};

use crate::NoteTree;

/// New state of a note.
///
/// Title and protection are always applied. Content is replaced only when
/// supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    pub title: String,
    pub content: Option<String>,
    pub is_protected: bool,
}

/// Modification timestamps of a note after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifiedDates {
    pub date_modified: DateTime<FixedOffset>,
    pub utc_date_modified: DateTime<Utc>,
}

impl NoteTree {
    /// Apply `update` to a note.
    ///
    /// A revision snapshot of the previous state is taken first when the
    /// snapshot policy asks for one. Supplied content is passed through
    /// link reconciliation before it is stored.
    #[instrument(skip_all, fields(subsystem = "tree", op = "update_note", note_id = %note_id))]
    pub async fn update_note(
        &self,
        note_id: &NoteId,
        update: NoteUpdate,
        access: &ContentAccess,
    ) -> Result<ModifiedDates> {
        let mut note = self
            .repos
            .notes
            .get(note_id)
            .await?
            .ok_or_else(|| Error::NoteNotFound(note_id.clone()))?;

        if !note.is_content_available(access) || (update.is_protected && !access.is_accessible())
        {
            return Err(Error::Unavailable(format!(
                "content of note {} is not available",
                note_id
            )));
        }

        self.save_revision_if_needed(&note, access).await?;

        let protection_changed = note.is_protected != update.is_protected;
        let reloaded = match (&update.content, protection_changed) {
            (None, true) => Some(self.load_note_content(&note, access).await?),
            _ => None,
        };

        let title_changed = note.title != update.title;
        note.title = update.title;
        note.is_protected = update.is_protected;
        note.touch(self.now());

        let content = match update.content {
            Some(content) => Some(self.sync_links(&note, content, access).await?),
            None => reloaded,
        };

        if let Some(content) = &content {
            note.content_length = content.len() as i64;
        }
        self.repos.notes.save(&note).await?;
        if let Some(content) = &content {
            self.write_note_content(&note, content, access).await?;
        }

        if title_changed {
            self.events.emit(TreeEvent::NoteTitleChanged {
                note_id: note.id.clone(),
                title: note.title.clone(),
            });
        }

        self.protect_revisions(&note, access).await?;

        info!(title_changed, protection_changed, "Note updated");
        Ok(ModifiedDates {
            date_modified: note.date_modified,
            utc_date_modified: note.utc_date_modified,
        })
    }
}
