//! Link extraction from note content.
//!
//! Text notes are scanned with four patterns in a fixed order; image and
//! internal link URLs are relativized as they are found so stored content
//! does not depend on the host it was edited from. Relation maps are JSON
//! documents whose `notes[].noteId` entries are the links.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use arbor_core::{Error, FoundLink, LinkKind, NoteType, Result};

static IMAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"src="[^"]*api/images/([a-zA-Z0-9]+)/"#).expect("image link pattern")
});

static IMAGE_URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"src="[^"]*/api/images/"#).expect("image url pattern"));

static INTERNAL_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="[^"]*#root[a-zA-Z0-9/]*/([a-zA-Z0-9]+)/?""#).expect("internal link pattern")
});

static INTERNAL_URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="[^"]*#root"#).expect("internal url pattern"));

static EXTERNAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([a-zA-Z]+://[^"]*)""#).expect("external link pattern"));

static INCLUDE_NOTE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<section class="include-note" data-note-id="([a-zA-Z0-9]+)">"#)
        .expect("include note pattern")
});

/// Links found in a piece of content, plus the content to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLinks {
    pub links: Vec<FoundLink>,
    pub content: String,
}

/// Extract the links of a note of `note_type`.
///
/// Types that carry no links yield an empty set and unchanged content.
pub fn extract_links(note_type: NoteType, content: String) -> Result<ExtractedLinks> {
    match note_type {
        NoteType::Text => Ok(extract_text_links(content)),
        NoteType::RelationMap => {
            let links = extract_relation_map_links(&content)?;
            Ok(ExtractedLinks { links, content })
        }
        _ => Ok(ExtractedLinks {
            links: Vec::new(),
            content,
        }),
    }
}

/// Scan HTML content for image, internal, external and inclusion links.
pub fn extract_text_links(content: String) -> ExtractedLinks {
    let mut links = Vec::new();

    collect(&IMAGE_LINK, &content, LinkKind::Image, &mut links);
    let content = IMAGE_URL_PREFIX
        .replace_all(&content, r#"src="api/images/"#)
        .into_owned();

    collect(&INTERNAL_LINK, &content, LinkKind::Internal, &mut links);
    let content = INTERNAL_URL_PREFIX
        .replace_all(&content, r##"href="#root"##)
        .into_owned();

    collect(&EXTERNAL_LINK, &content, LinkKind::External, &mut links);
    collect(&INCLUDE_NOTE_LINK, &content, LinkKind::IncludeNote, &mut links);

    ExtractedLinks { links, content }
}

fn collect(pattern: &Regex, content: &str, kind: LinkKind, links: &mut Vec<FoundLink>) {
    links.extend(
        pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| FoundLink::new(kind, m.as_str())),
    );
}

#[derive(Debug, Deserialize)]
struct RelationMapDocument {
    #[serde(default)]
    notes: Vec<RelationMapNote>,
}

#[derive(Debug, Deserialize)]
struct RelationMapNote {
    #[serde(rename = "noteId")]
    note_id: String,
}

/// Read the note references of a relation map document.
///
/// Blank content is an empty map.
pub fn extract_relation_map_links(content: &str) -> Result<Vec<FoundLink>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: RelationMapDocument = serde_json::from_str(content)
        .map_err(|e| Error::Validation(format!("Invalid relation map content: {}", e)))?;

    Ok(document
        .notes
        .into_iter()
        .map(|note| FoundLink::new(LinkKind::RelationMap, note.note_id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(links: &[FoundLink], kind: LinkKind) -> Vec<&str> {
        links
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| l.value.as_str())
            .collect()
    }

    #[test]
    fn test_image_link_is_found_and_relativized() {
        let extracted =
            extract_text_links(r#"<img src="http://host/api/images/abc123/x.png">"#.to_string());
        assert_eq!(
            extracted.links,
            vec![FoundLink::new(LinkKind::Image, "abc123")]
        );
        assert_eq!(extracted.content, r#"<img src="api/images/abc123/x.png">"#);
    }

    #[test]
    fn test_relative_image_link_left_alone() {
        let content = r#"<img src="api/images/abc123/x.png">"#.to_string();
        let extracted = extract_text_links(content.clone());
        assert_eq!(values(&extracted.links, LinkKind::Image), vec!["abc123"]);
        assert_eq!(extracted.content, content);
    }

    #[test]
    fn test_internal_link_uses_last_path_segment() {
        let extracted = extract_text_links(
            r#"<a href="http://localhost:8080/#root/aaa/bbb/ccc123">x</a>"#.to_string(),
        );
        assert_eq!(values(&extracted.links, LinkKind::Internal), vec!["ccc123"]);
        assert_eq!(extracted.content, r##"<a href="#root/aaa/bbb/ccc123">x</a>"##);
        assert!(values(&extracted.links, LinkKind::External).is_empty());
    }

    #[test]
    fn test_internal_link_with_trailing_slash() {
        let extracted = extract_text_links(r##"<a href="#root/abc/">x</a>"##.to_string());
        assert_eq!(values(&extracted.links, LinkKind::Internal), vec!["abc"]);
    }

    #[test]
    fn test_external_link() {
        let extracted =
            extract_text_links(r#"<a href="https://example.com/page?q=1">x</a>"#.to_string());
        assert_eq!(
            values(&extracted.links, LinkKind::External),
            vec!["https://example.com/page?q=1"]
        );
        assert!(values(&extracted.links, LinkKind::Internal).is_empty());
    }

    #[test]
    fn test_include_note_link() {
        let extracted = extract_text_links(
            r#"<section class="include-note" data-note-id="inc42">&nbsp;</section>"#.to_string(),
        );
        assert_eq!(
            values(&extracted.links, LinkKind::IncludeNote),
            vec!["inc42"]
        );
    }

    #[test]
    fn test_scan_order_is_fixed() {
        let extracted = extract_text_links(
            concat!(
                r#"<section class="include-note" data-note-id="inc">"#,
                r#"<a href="https://x.org">e</a>"#,
                r##"<a href="#root/int">i</a>"##,
                r#"<img src="api/images/img/a.png">"#,
            )
            .to_string(),
        );
        let kinds: Vec<LinkKind> = extracted.links.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LinkKind::Image,
                LinkKind::Internal,
                LinkKind::External,
                LinkKind::IncludeNote
            ]
        );
    }

    #[test]
    fn test_plain_text_has_no_links() {
        let extracted = extract_text_links("<p>just words</p>".to_string());
        assert!(extracted.links.is_empty());
        assert_eq!(extracted.content, "<p>just words</p>");
    }

    #[test]
    fn test_relation_map_links() {
        let links = extract_relation_map_links(
            r#"{"notes":[{"noteId":"a1","x":10},{"noteId":"b2","x":20}],"relations":[]}"#,
        )
        .unwrap();
        assert_eq!(
            links,
            vec![
                FoundLink::new(LinkKind::RelationMap, "a1"),
                FoundLink::new(LinkKind::RelationMap, "b2"),
            ]
        );
    }

    #[test]
    fn test_relation_map_invalid_json() {
        let err = extract_relation_map_links("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_relation_map_blank_is_empty() {
        assert!(extract_relation_map_links("  ").unwrap().is_empty());
    }

    #[test]
    fn test_other_types_pass_through() {
        let extracted =
            extract_links(NoteType::Code, r#"href="https://x.org""#.to_string()).unwrap();
        assert!(extracted.links.is_empty());
    }
}
