//! Row shapes and their conversion to core models.

use chrono::{DateTime, FixedOffset, Utc};

use arbor_core::{
    Attribute, AttributeType, Branch, Error, Lifecycle, Note, NoteType, Result, Revision,
};

pub(crate) fn parse_local(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Serialization(format!("invalid local timestamp '{}': {}", raw, e)))
}

pub(crate) fn format_local(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339()
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NoteRow {
    pub id: String,
    pub title: String,
    pub note_type: String,
    pub mime: String,
    pub is_protected: bool,
    pub is_deleted: bool,
    pub delete_id: Option<String>,
    pub is_erased: bool,
    pub content_length: i64,
    pub date_created: String,
    pub date_modified: String,
    pub utc_date_created: DateTime<Utc>,
    pub utc_date_modified: DateTime<Utc>,
}

impl TryFrom<NoteRow> for Note {
    type Error = Error;

    fn try_from(row: NoteRow) -> Result<Self> {
        Ok(Note {
            id: row.id.into(),
            title: row.title,
            note_type: row.note_type.parse::<NoteType>()?,
            mime: row.mime,
            is_protected: row.is_protected,
            lifecycle: Lifecycle::from_columns(row.is_deleted, row.delete_id),
            is_erased: row.is_erased,
            content_length: row.content_length,
            date_created: parse_local(&row.date_created)?,
            date_modified: parse_local(&row.date_modified)?,
            utc_date_created: row.utc_date_created,
            utc_date_modified: row.utc_date_modified,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BranchRow {
    pub id: String,
    pub note_id: String,
    pub parent_note_id: String,
    pub position: i64,
    pub prefix: Option<String>,
    pub is_expanded: bool,
    pub is_deleted: bool,
    pub delete_id: Option<String>,
    pub utc_date_modified: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id.into(),
            note_id: row.note_id.into(),
            parent_note_id: row.parent_note_id.into(),
            position: row.position,
            prefix: row.prefix,
            is_expanded: row.is_expanded,
            lifecycle: Lifecycle::from_columns(row.is_deleted, row.delete_id),
            utc_date_modified: row.utc_date_modified,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttributeRow {
    pub id: String,
    pub note_id: String,
    pub attribute_type: String,
    pub name: String,
    pub value: String,
    pub position: i64,
    pub is_inheritable: bool,
    pub is_deleted: bool,
    pub delete_id: Option<String>,
    pub is_erased: bool,
    pub utc_date_modified: DateTime<Utc>,
}

impl TryFrom<AttributeRow> for Attribute {
    type Error = Error;

    fn try_from(row: AttributeRow) -> Result<Self> {
        Ok(Attribute {
            id: row.id.into(),
            note_id: row.note_id.into(),
            attribute_type: row.attribute_type.parse::<AttributeType>()?,
            name: row.name,
            value: row.value,
            position: row.position,
            is_inheritable: row.is_inheritable,
            lifecycle: Lifecycle::from_columns(row.is_deleted, row.delete_id),
            is_erased: row.is_erased,
            utc_date_modified: row.utc_date_modified,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RevisionRow {
    pub id: String,
    pub note_id: String,
    pub title: Option<String>,
    pub note_type: String,
    pub mime: String,
    pub is_protected: bool,
    pub is_erased: bool,
    pub content_length: i64,
    pub date_last_edited: String,
    pub date_created: String,
    pub utc_date_last_edited: DateTime<Utc>,
    pub utc_date_created: DateTime<Utc>,
    pub utc_date_modified: DateTime<Utc>,
}

impl TryFrom<RevisionRow> for Revision {
    type Error = Error;

    fn try_from(row: RevisionRow) -> Result<Self> {
        Ok(Revision {
            id: row.id.into(),
            note_id: row.note_id.into(),
            title: row.title,
            note_type: row.note_type.parse::<NoteType>()?,
            mime: row.mime,
            is_protected: row.is_protected,
            is_erased: row.is_erased,
            content_length: row.content_length,
            date_last_edited: parse_local(&row.date_last_edited)?,
            date_created: parse_local(&row.date_created)?,
            utc_date_last_edited: row.utc_date_last_edited,
            utc_date_created: row.utc_date_created,
            utc_date_modified: row.utc_date_modified,
        })
    }
}
