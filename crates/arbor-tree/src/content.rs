//! Reading and writing note and revision content.
//!
//! Stored content of a protected entity is ciphertext; these helpers are
//! the only place that crosses between the two forms.

use arbor_core::{ContentAccess, Error, Note, Result, Revision};

use crate::NoteTree;

fn reveal(stored: String, is_protected: bool, access: &ContentAccess) -> Result<String> {
    if is_protected {
        access.cipher()?.decrypt(&stored)
    } else {
        Ok(stored)
    }
}

fn conceal(plaintext: &str, is_protected: bool, access: &ContentAccess) -> Result<String> {
    if is_protected {
        access.cipher()?.encrypt(plaintext)
    } else {
        Ok(plaintext.to_string())
    }
}

impl NoteTree {
    /// Plaintext content of `note`.
    pub(crate) async fn load_note_content(
        &self,
        note: &Note,
        access: &ContentAccess,
    ) -> Result<String> {
        if !note.is_content_available(access) {
            return Err(Error::Unavailable(format!(
                "content of protected note {} is not available",
                note.id
            )));
        }

        let stored = self
            .repos
            .notes
            .get_content(&note.id)
            .await?
            .ok_or_else(|| {
                Error::Unavailable(format!("content of note {} cannot be loaded", note.id))
            })?;

        reveal(stored, note.is_protected, access)
    }

    /// Store `plaintext` as the content of `note`, encrypted when protected.
    pub(crate) async fn write_note_content(
        &self,
        note: &Note,
        plaintext: &str,
        access: &ContentAccess,
    ) -> Result<()> {
        let stored = conceal(plaintext, note.is_protected, access)?;
        self.repos.notes.save_content(&note.id, &stored).await
    }

    /// Plaintext content of `revision`; erased revisions read as empty.
    pub(crate) async fn load_revision_content(
        &self,
        revision: &Revision,
        access: &ContentAccess,
    ) -> Result<String> {
        match self.repos.revisions.get_content(&revision.id).await? {
            Some(stored) => reveal(stored, revision.is_protected, access),
            None => Ok(String::new()),
        }
    }

    pub(crate) async fn write_revision_content(
        &self,
        revision: &Revision,
        plaintext: &str,
        access: &ContentAccess,
    ) -> Result<()> {
        let stored = conceal(plaintext, revision.is_protected, access)?;
        self.repos
            .revisions
            .save_content(&revision.id, &stored)
            .await
    }
}
