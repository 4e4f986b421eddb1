//! Note creation.

use std::str::FromStr;

use tracing::{debug, info, instrument};

use arbor_core::{
    defaults, derive_mime, Attribute, Branch, BranchId, ContentAccess, Error, LifecycleFilter,
    Note, NoteId, NoteType, Result, TreeEvent, CHILD_ATTRIBUTE_PREFIX,
};

use crate::NoteTree;

/// Parameters of a new note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub parent_note_id: NoteId,
    pub title: String,
    pub content: String,
    pub note_type: Option<NoteType>,
    /// Overrides the mime implied by the type.
    pub mime: Option<String>,
    /// `None` inherits protection from the parent when access allows.
    pub is_protected: Option<bool>,
    /// `None` appends after the last live sibling.
    pub position: Option<i64>,
    pub prefix: Option<String>,
    pub is_expanded: bool,
}

impl NewNote {
    pub fn new(
        parent_note_id: impl Into<NoteId>,
        title: impl Into<String>,
        note_type: NoteType,
    ) -> Self {
        Self {
            parent_note_id: parent_note_id.into(),
            title: title.into(),
            content: String::new(),
            note_type: Some(note_type),
            mime: None,
            is_protected: None,
            position: None,
            prefix: None,
            is_expanded: false,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_protected(mut self, is_protected: bool) -> Self {
        self.is_protected = Some(is_protected);
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn expanded(mut self) -> Self {
        self.is_expanded = true;
        self
    }
}

/// Where a note is created relative to a reference branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTarget {
    /// As a child of the reference branch's note.
    Into,
    /// As the next sibling of the reference branch.
    After,
}

impl FromStr for CreateTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "into" => Ok(CreateTarget::Into),
            "after" => Ok(CreateTarget::After),
            other => Err(Error::Validation(format!("Unknown target '{}'", other))),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Note title must not be empty".into()));
    }
    Ok(())
}

/// A creation request checked against the store and the session.
struct CheckedNote {
    parent: Note,
    note_type: NoteType,
    mime: String,
    is_protected: bool,
}

impl NoteTree {
    /// Create a note under `params.parent_note_id`.
    ///
    /// Returns the new note and the branch placing it.
    #[instrument(skip_all, fields(subsystem = "tree", op = "create_note", parent_note_id = %params.parent_note_id))]
    pub async fn create_note(
        &self,
        params: NewNote,
        access: &ContentAccess,
    ) -> Result<(Note, Branch)> {
        let checked = self.check_new_note(&params, access).await?;
        self.insert_note(params, checked, access).await
    }

    /// Create a note relative to `reference_branch_id`.
    ///
    /// `target` is `"into"` or `"after"`; anything else is rejected. An
    /// `"after"` request is fully checked before any sibling moves.
    #[instrument(skip_all, fields(subsystem = "tree", op = "create_note_with_target", branch_id = %reference_branch_id))]
    pub async fn create_note_with_target(
        &self,
        target: &str,
        reference_branch_id: &BranchId,
        mut params: NewNote,
        access: &ContentAccess,
    ) -> Result<(Note, Branch)> {
        let target = target.parse::<CreateTarget>()?;
        validate_title(&params.title)?;

        match target {
            CreateTarget::Into => self.create_note(params, access).await,
            CreateTarget::After => {
                let reference = self
                    .repos
                    .branches
                    .get(reference_branch_id)
                    .await?
                    .ok_or_else(|| Error::BranchNotFound(reference_branch_id.clone()))?;

                let parent_note_id = reference.parent_note_id.clone();
                params.parent_note_id = parent_note_id.clone();
                params.position = Some(reference.position + defaults::POSITION_STEP);
                let checked = self.check_new_note(&params, access).await?;

                let shifted = self
                    .repos
                    .branches
                    .shift_positions_after(
                        &parent_note_id,
                        reference.position,
                        defaults::POSITION_STEP,
                    )
                    .await?;
                let created = self.insert_note(params, checked, access).await?;

                self.events
                    .emit(TreeEvent::NoteReordered { parent_note_id });
                debug!(shifted, "Siblings shifted for insert");
                Ok(created)
            }
        }
    }

    /// Everything that can reject a creation, without writing anything.
    async fn check_new_note(
        &self,
        params: &NewNote,
        access: &ContentAccess,
    ) -> Result<CheckedNote> {
        validate_title(&params.title)?;

        let parent = self
            .repos
            .notes
            .get(&params.parent_note_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Parent note '{}' does not exist",
                    params.parent_note_id
                ))
            })?;

        let mime = derive_mime(params.note_type, params.mime.as_deref())?;
        let note_type = params
            .note_type
            .ok_or_else(|| Error::Validation("Note type is a required param".into()))?;

        let is_protected = params
            .is_protected
            .unwrap_or(parent.is_protected && access.is_accessible());
        if is_protected && !access.is_accessible() {
            return Err(Error::Unavailable(
                "cannot create protected note while the protected session is locked".into(),
            ));
        }

        Ok(CheckedNote {
            parent,
            note_type,
            mime,
            is_protected,
        })
    }

    async fn insert_note(
        &self,
        params: NewNote,
        checked: CheckedNote,
        access: &ContentAccess,
    ) -> Result<(Note, Branch)> {
        let CheckedNote {
            parent,
            note_type,
            mime,
            is_protected,
        } = checked;

        let now = self.now();
        let mut note = Note::new(NoteId::generate(), params.title, note_type, mime, now);
        note.is_protected = is_protected;
        note.content_length = params.content.len() as i64;
        self.repos.notes.save(&note).await?;
        self.write_note_content(&note, &params.content, access)
            .await?;

        let position = match params.position {
            Some(position) => position,
            None => self.next_child_position(&parent.id).await?,
        };
        let mut branch = Branch::new(note.id.clone(), parent.id.clone(), position, now);
        branch.prefix = params.prefix;
        branch.is_expanded = params.is_expanded;
        self.repos.branches.save(&branch).await?;

        self.copy_child_attributes(&parent, &note).await?;

        self.events.emit(TreeEvent::ChildNoteCreated {
            child_note_id: note.id.clone(),
            parent_note_id: parent.id.clone(),
        });
        self.events.emit(TreeEvent::NoteTitleChanged {
            note_id: note.id.clone(),
            title: note.title.clone(),
        });

        info!(note_id = %note.id, branch_id = %branch.id, position, "Note created");
        Ok((note, branch))
    }

    /// Copy the parent's `child:` attributes onto a new child note.
    async fn copy_child_attributes(&self, parent: &Note, note: &Note) -> Result<()> {
        let templates = self
            .repos
            .attributes
            .owned_by(&parent.id, LifecycleFilter::Live)
            .await?;

        for template in templates {
            let Some(name) = template.name.strip_prefix(CHILD_ATTRIBUTE_PREFIX) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let mut attribute = Attribute::new(
                note.id.clone(),
                template.attribute_type,
                name,
                template.value.clone(),
                self.now(),
            );
            attribute.position = template.position;
            attribute.is_inheritable = template.is_inheritable;
            self.repos.attributes.save(&attribute).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_target_parsing() {
        assert_eq!("into".parse::<CreateTarget>().unwrap(), CreateTarget::Into);
        assert_eq!(
            "after".parse::<CreateTarget>().unwrap(),
            CreateTarget::After
        );
        assert!(matches!(
            "before".parse::<CreateTarget>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_new_note_builder() {
        let params = NewNote::new("root", "Inbox", NoteType::Code)
            .with_content("fn main() {}")
            .with_prefix("src")
            .with_position(40)
            .expanded();
        assert_eq!(params.parent_note_id, NoteId::root());
        assert_eq!(params.position, Some(40));
        assert_eq!(params.prefix.as_deref(), Some("src"));
        assert!(params.is_expanded);
        assert_eq!(params.is_protected, None);
    }
}
