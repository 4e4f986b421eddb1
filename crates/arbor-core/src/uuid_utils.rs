//! Identifier generation for arbor entities.
//!
//! Entity identifiers are UUIDv7 values rendered in the 32-character
//! "simple" hex form. The simple form is purely alphanumeric, which keeps
//! identifiers embeddable in note markup (`api/images/<id>/`,
//! `#root/<id>/<id>`, `data-note-id="<id>"`) where the link scanners only
//! accept `[a-zA-Z0-9]+`.
//!
//! Because the leading 48 bits carry a millisecond timestamp, identifiers
//! generated later sort lexicographically after earlier ones.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new alphanumeric entity identifier.
///
/// # Example
///
/// ```
/// use arbor_core::uuid_utils::new_entity_id;
///
/// let id = new_entity_id();
/// assert_eq!(id.len(), 32);
/// assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn new_entity_id() -> String {
    new_v7().simple().to_string()
}

/// Extract the creation timestamp embedded in an entity identifier.
///
/// Returns `None` for identifiers that are not UUIDv7 values (fixed ids
/// such as `root`, or ids imported from elsewhere).
pub fn extract_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let uuid = Uuid::try_parse(id).ok()?;
    let bytes = uuid.as_bytes();
    if (bytes[6] >> 4) != 7 {
        return None;
    }

    let millis = ((bytes[0] as u64) << 40)
        | ((bytes[1] as u64) << 32)
        | ((bytes[2] as u64) << 24)
        | ((bytes[3] as u64) << 16)
        | ((bytes[4] as u64) << 8)
        | (bytes[5] as u64);

    Utc.timestamp_millis_opt(millis as i64).single()
}
