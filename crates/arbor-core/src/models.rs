//! Core data models for arbor.
//!
//! These types are shared across all arbor crates and represent the
//! persisted entities of the note tree: notes, branches (placements of a
//! note under a parent), attributes and revisions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::uuid_utils::new_entity_id;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, time-ordered identifier.
            pub fn generate() -> Self {
                Self(new_entity_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Note`].
    NoteId
);
entity_id!(
    /// Identifier of a [`Branch`].
    BranchId
);
entity_id!(
    /// Identifier of an [`Attribute`].
    AttributeId
);
entity_id!(
    /// Identifier of a [`Revision`].
    RevisionId
);
entity_id!(
    /// Tag shared by every entity soft-deleted by one delete operation.
    ///
    /// Undelete restores only entities carrying the same batch.
    DeleteBatch
);

/// Id of the tree root note.
pub const ROOT_NOTE_ID: &str = "root";

/// Id of the branch placing the root note.
pub const ROOT_BRANCH_ID: &str = "root";

/// Parent id recorded on the root branch.
pub const ROOT_PARENT_ID: &str = "none";

/// Title given to erased notes.
pub const ERASED_NOTE_TITLE: &str = "[deleted]";

/// Name given to attributes of erased notes.
pub const ERASED_ATTRIBUTE_NAME: &str = "deleted";

/// Label that opts a note out of automatic revision snapshots.
pub const DISABLE_VERSIONING_LABEL: &str = "disableVersioning";

/// Parent attributes with this name prefix are copied onto new children.
pub const CHILD_ATTRIBUTE_PREFIX: &str = "child:";

impl NoteId {
    pub fn root() -> Self {
        Self::from(ROOT_NOTE_ID)
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NOTE_ID
    }
}

impl BranchId {
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_BRANCH_ID
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Soft-delete state shared by notes, branches and attributes.
///
/// Entities deleted by a cascade carry the batch of the delete operation.
/// Link attributes retired by the link synchronizer carry no batch, so no
/// undelete ever revives them; only a later scan that finds the link again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "batch", rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Live,
    Deleted(Option<DeleteBatch>),
}

impl Lifecycle {
    pub fn is_live(&self) -> bool {
        matches!(self, Lifecycle::Live)
    }

    pub fn is_deleted(&self) -> bool {
        !self.is_live()
    }

    /// Batch that deleted the entity, if any.
    pub fn batch(&self) -> Option<&DeleteBatch> {
        match self {
            Lifecycle::Deleted(batch) => batch.as_ref(),
            Lifecycle::Live => None,
        }
    }

    /// True when the entity was deleted by exactly this batch.
    pub fn deleted_in(&self, batch: &DeleteBatch) -> bool {
        self.batch() == Some(batch)
    }

    /// Split into the `(is_deleted, delete_id)` column pair used by stores.
    pub fn to_columns(&self) -> (bool, Option<&str>) {
        match self {
            Lifecycle::Live => (false, None),
            Lifecycle::Deleted(batch) => (true, batch.as_ref().map(DeleteBatch::as_str)),
        }
    }

    /// Rebuild from the `(is_deleted, delete_id)` column pair.
    pub fn from_columns(is_deleted: bool, delete_id: Option<String>) -> Self {
        if is_deleted {
            Lifecycle::Deleted(delete_id.map(DeleteBatch::from))
        } else {
            Lifecycle::Live
        }
    }
}

/// Lifecycle predicate for repository queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleFilter {
    /// Only entities that are not deleted.
    Live,
    /// Only entities deleted by the given batch.
    DeletedIn(DeleteBatch),
    /// Every entity regardless of deletion.
    Any,
}

impl LifecycleFilter {
    pub fn matches(&self, lifecycle: &Lifecycle) -> bool {
        match self {
            LifecycleFilter::Live => lifecycle.is_live(),
            LifecycleFilter::DeletedIn(batch) => lifecycle.deleted_in(batch),
            LifecycleFilter::Any => true,
        }
    }
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Content type of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteType {
    Text,
    Code,
    File,
    Image,
    Search,
    Book,
    RelationMap,
    Render,
}

impl NoteType {
    pub const ALL: [NoteType; 8] = [
        NoteType::Text,
        NoteType::Code,
        NoteType::File,
        NoteType::Image,
        NoteType::Search,
        NoteType::Book,
        NoteType::RelationMap,
        NoteType::Render,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Text => "text",
            NoteType::Code => "code",
            NoteType::File => "file",
            NoteType::Image => "image",
            NoteType::Search => "search",
            NoteType::Book => "book",
            NoteType::RelationMap => "relation-map",
            NoteType::Render => "render",
        }
    }

    /// Mime implied by the type, or `None` when the caller must supply one.
    pub fn default_mime(self) -> Option<&'static str> {
        match self {
            NoteType::Text => Some("text/html"),
            NoteType::Code => Some("text/plain"),
            NoteType::RelationMap | NoteType::Search => Some("application/json"),
            NoteType::Render | NoteType::Book => Some(""),
            NoteType::File | NoteType::Image => None,
        }
    }

    /// Binary attachments are versioned outside the revision policy.
    pub fn is_versioned_separately(self) -> bool {
        matches!(self, NoteType::File | NoteType::Image)
    }

    /// Types whose content is scanned for links.
    pub fn carries_links(self) -> bool {
        matches!(self, NoteType::Text | NoteType::RelationMap)
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NoteType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown note type '{}'", s)))
    }
}

/// Resolve the mime of a new note.
///
/// An explicit, non-empty mime always wins; otherwise the type's default
/// applies. Binary types have no default and require an explicit mime.
pub fn derive_mime(note_type: Option<NoteType>, mime: Option<&str>) -> Result<String> {
    let note_type =
        note_type.ok_or_else(|| Error::Validation("Note type is a required param".into()))?;

    if let Some(mime) = mime.filter(|m| !m.is_empty()) {
        return Ok(mime.to_string());
    }

    note_type.default_mime().map(String::from).ok_or_else(|| {
        Error::Validation(format!("Mime is required for notes of type '{}'", note_type))
    })
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A content-bearing entity of the tree.
///
/// Content lives in a separate row, read and written through the content
/// helpers which encrypt or decrypt according to `is_protected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub note_type: NoteType,
    pub mime: String,
    pub is_protected: bool,
    pub lifecycle: Lifecycle,
    pub is_erased: bool,
    pub content_length: i64,
    pub date_created: DateTime<FixedOffset>,
    pub date_modified: DateTime<FixedOffset>,
    pub utc_date_created: DateTime<Utc>,
    pub utc_date_modified: DateTime<Utc>,
}

/// Local wall-clock rendering of a UTC instant.
pub fn to_local(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&chrono::Local).fixed_offset()
}

impl Note {
    /// A live, unprotected note with empty content, stamped at `now`.
    pub fn new(
        id: NoteId,
        title: impl Into<String>,
        note_type: NoteType,
        mime: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let local = to_local(now);
        Self {
            id,
            title: title.into(),
            note_type,
            mime: mime.into(),
            is_protected: false,
            lifecycle: Lifecycle::Live,
            is_erased: false,
            content_length: 0,
            date_created: local,
            date_modified: local,
            utc_date_created: now,
            utc_date_modified: now,
        }
    }

    /// The tree root and its anchoring branch.
    pub fn root(now: DateTime<Utc>) -> (Note, Branch) {
        let note = Note::new(NoteId::root(), "root", NoteType::Text, "text/html", now);
        let mut branch = Branch::new(NoteId::root(), NoteId::from(ROOT_PARENT_ID), 0, now);
        branch.id = BranchId::from(ROOT_BRANCH_ID);
        branch.is_expanded = true;
        (note, branch)
    }

    /// Stamp the modification timestamps.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.utc_date_modified = now;
        self.date_modified = to_local(now);
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    /// Whether the content can be read with the given access.
    pub fn is_content_available(&self, access: &crate::ContentAccess) -> bool {
        !self.is_protected || access.is_accessible()
    }
}

/// Placement of one note under one parent note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub note_id: NoteId,
    pub parent_note_id: NoteId,
    pub position: i64,
    pub prefix: Option<String>,
    pub is_expanded: bool,
    pub lifecycle: Lifecycle,
    pub utc_date_modified: DateTime<Utc>,
}

impl Branch {
    pub fn new(note_id: NoteId, parent_note_id: NoteId, position: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: BranchId::generate(),
            note_id,
            parent_note_id,
            position,
            prefix: None,
            is_expanded: false,
            lifecycle: Lifecycle::Live,
            utc_date_modified: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root() || self.note_id.is_root()
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }
}

/// Kind of attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Free key/value annotation.
    Label,
    /// Typed reference; the value is the target note id.
    Relation,
}

impl AttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::Label => "label",
            AttributeType::Relation => "relation",
        }
    }
}

impl FromStr for AttributeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "label" => Ok(AttributeType::Label),
            "relation" => Ok(AttributeType::Relation),
            other => Err(Error::Validation(format!(
                "Unknown attribute type '{}'",
                other
            ))),
        }
    }
}

/// Label or relation owned by a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub note_id: NoteId,
    pub attribute_type: AttributeType,
    pub name: String,
    pub value: String,
    pub position: i64,
    pub is_inheritable: bool,
    pub lifecycle: Lifecycle,
    pub is_erased: bool,
    pub utc_date_modified: DateTime<Utc>,
}

impl Attribute {
    pub fn new(
        note_id: NoteId,
        attribute_type: AttributeType,
        name: impl Into<String>,
        value: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttributeId::generate(),
            note_id,
            attribute_type,
            name: name.into(),
            value: value.into(),
            position: 0,
            is_inheritable: false,
            lifecycle: Lifecycle::Live,
            is_erased: false,
            utc_date_modified: now,
        }
    }

    /// True for a relation pointing at `note_id`.
    pub fn targets(&self, note_id: &NoteId) -> bool {
        self.attribute_type == AttributeType::Relation && self.value == note_id.as_str()
    }

    /// Link kind when this attribute is a derived link attribute.
    pub fn link_kind(&self) -> Option<LinkKind> {
        LinkKind::from_attribute_name(&self.name)
            .filter(|kind| kind.attribute_type() == self.attribute_type)
    }
}

/// Immutable snapshot of a note's title and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub note_id: NoteId,
    /// Cleared when the revision is erased.
    pub title: Option<String>,
    pub note_type: NoteType,
    pub mime: String,
    pub is_protected: bool,
    pub is_erased: bool,
    pub content_length: i64,
    pub date_last_edited: DateTime<FixedOffset>,
    pub date_created: DateTime<FixedOffset>,
    pub utc_date_last_edited: DateTime<Utc>,
    pub utc_date_created: DateTime<Utc>,
    pub utc_date_modified: DateTime<Utc>,
}

// =============================================================================
// LINKS
// =============================================================================

/// Kind of derived link attribute maintained from note content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Image,
    Internal,
    External,
    IncludeNote,
    RelationMap,
}

impl LinkKind {
    pub const ALL: [LinkKind; 5] = [
        LinkKind::Image,
        LinkKind::Internal,
        LinkKind::External,
        LinkKind::IncludeNote,
        LinkKind::RelationMap,
    ];

    /// Attribute name the link is stored under.
    pub fn attribute_name(self) -> &'static str {
        match self {
            LinkKind::Image => "imageLink",
            LinkKind::Internal => "internalLink",
            LinkKind::External => "externalLink",
            LinkKind::IncludeNote => "includeNoteLink",
            LinkKind::RelationMap => "relationMapLink",
        }
    }

    /// External links are labels (their value is a URL); all others relations.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            LinkKind::External => AttributeType::Label,
            LinkKind::Image | LinkKind::Internal | LinkKind::IncludeNote | LinkKind::RelationMap => {
                AttributeType::Relation
            }
        }
    }

    /// Whether the link value is a note id that must resolve.
    pub fn targets_note(self) -> bool {
        self != LinkKind::External
    }

    pub fn from_attribute_name(name: &str) -> Option<LinkKind> {
        LinkKind::ALL
            .into_iter()
            .find(|kind| kind.attribute_name() == name)
    }
}

/// A link found in note content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FoundLink {
    pub kind: LinkKind,
    pub value: String,
}

impl FoundLink {
    pub fn new(kind: LinkKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// True when `attribute` stores exactly this link.
    pub fn matches(&self, attribute: &Attribute) -> bool {
        attribute.name == self.kind.attribute_name() && attribute.value == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_note_and_branch() {
        let (note, branch) = Note::root(Utc::now());
        assert!(note.id.is_root());
        assert!(branch.is_root());
        assert_eq!(branch.parent_note_id.as_str(), ROOT_PARENT_ID);
        assert!(note.lifecycle.is_live());
    }

    #[test]
    fn test_derive_mime_table() {
        assert_eq!(derive_mime(Some(NoteType::Text), None).unwrap(), "text/html");
        assert_eq!(derive_mime(Some(NoteType::Code), None).unwrap(), "text/plain");
        assert_eq!(
            derive_mime(Some(NoteType::RelationMap), None).unwrap(),
            "application/json"
        );
        assert_eq!(
            derive_mime(Some(NoteType::Search), None).unwrap(),
            "application/json"
        );
        assert_eq!(derive_mime(Some(NoteType::Render), None).unwrap(), "");
        assert_eq!(derive_mime(Some(NoteType::Book), None).unwrap(), "");
    }

    #[test]
    fn test_derive_mime_explicit_override() {
        assert_eq!(
            derive_mime(Some(NoteType::Code), Some("application/javascript")).unwrap(),
            "application/javascript"
        );
        assert_eq!(
            derive_mime(Some(NoteType::Image), Some("image/png")).unwrap(),
            "image/png"
        );
    }

    #[test]
    fn test_derive_mime_missing_type() {
        assert!(matches!(
            derive_mime(None, Some("text/html")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_derive_mime_binary_requires_mime() {
        assert!(matches!(
            derive_mime(Some(NoteType::File), None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_note_type_parse() {
        for t in NoteType::ALL {
            assert_eq!(t.as_str().parse::<NoteType>().unwrap(), t);
        }
        assert!("spreadsheet".parse::<NoteType>().is_err());
    }

    #[test]
    fn test_note_type_serde_kebab() {
        let json = serde_json::to_string(&NoteType::RelationMap).unwrap();
        assert_eq!(json, r#""relation-map""#);
    }

    #[test]
    fn test_lifecycle_batch_matching() {
        let batch = DeleteBatch::generate();
        let other = DeleteBatch::generate();
        let deleted = Lifecycle::Deleted(Some(batch.clone()));

        assert!(deleted.deleted_in(&batch));
        assert!(!deleted.deleted_in(&other));
        assert!(!Lifecycle::Live.deleted_in(&batch));
        assert!(!Lifecycle::Deleted(None).deleted_in(&batch));
        assert!(LifecycleFilter::DeletedIn(batch).matches(&deleted));
        assert!(!LifecycleFilter::Live.matches(&deleted));
        assert!(LifecycleFilter::Any.matches(&deleted));
    }

    #[test]
    fn test_lifecycle_columns_roundtrip() {
        let batch = DeleteBatch::from("batch1");
        let lifecycle = Lifecycle::Deleted(Some(batch));
        let (deleted, id) = lifecycle.to_columns();
        assert!(deleted);
        assert_eq!(id, Some("batch1"));
        assert_eq!(
            Lifecycle::from_columns(deleted, id.map(String::from)),
            lifecycle
        );
        assert_eq!(Lifecycle::from_columns(false, None), Lifecycle::Live);
    }

    #[test]
    fn test_link_kind_table() {
        for kind in LinkKind::ALL {
            assert_eq!(
                LinkKind::from_attribute_name(kind.attribute_name()),
                Some(kind)
            );
        }
        assert_eq!(LinkKind::External.attribute_type(), AttributeType::Label);
        assert_eq!(LinkKind::Image.attribute_type(), AttributeType::Relation);
        assert!(!LinkKind::External.targets_note());
        assert!(LinkKind::from_attribute_name("author").is_none());
    }

    #[test]
    fn test_attribute_link_kind_requires_matching_type() {
        let now = Utc::now();
        let relation = Attribute::new(
            NoteId::from("n1"),
            AttributeType::Relation,
            "imageLink",
            "img1",
            now,
        );
        assert_eq!(relation.link_kind(), Some(LinkKind::Image));

        let label = Attribute::new(NoteId::from("n1"), AttributeType::Label, "imageLink", "x", now);
        assert_eq!(label.link_kind(), None);
    }

    #[test]
    fn test_root_ids() {
        assert!(NoteId::root().is_root());
        assert!(BranchId::from(ROOT_BRANCH_ID).is_root());
        assert!(!NoteId::generate().is_root());
    }
}
