//! Updates, revision snapshots and protection changes.

mod helpers;

use chrono::Duration;

use arbor_core::{
    Attribute, AttributeType, Clock, Error, NoteId, NoteType, RevisionRepository, TreeEvent,
    DISABLE_VERSIONING_LABEL,
};
use arbor_tree::{NewNote, NoteUpdate};

use helpers::{decode, locked, start_time, unlocked, Harness};

fn update(title: &str, content: Option<&str>) -> NoteUpdate {
    NoteUpdate {
        title: title.to_string(),
        content: content.map(String::from),
        is_protected: false,
    }
}

#[tokio::test]
async fn test_update_applies_title_and_content() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Draft", "<p>v1</p>").await;
    h.clock.advance(Duration::seconds(30));

    let dates = h
        .tree
        .update_note(&note.id, update("Final", Some("<p>v2</p>")), &unlocked())
        .await
        .unwrap();

    let stored = h.note(&note.id).await;
    assert_eq!(stored.title, "Final");
    assert_eq!(stored.content_length, 9);
    assert_eq!(dates.utc_date_modified, h.clock.now());
    assert_eq!(dates.utc_date_modified, stored.utc_date_modified);
    assert_eq!(dates.date_modified, stored.date_modified);
    assert_eq!(
        h.store.raw_note_content(&note.id).await.as_deref(),
        Some("<p>v2</p>")
    );
}

#[tokio::test]
async fn test_title_only_update_keeps_content() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Draft", "<p>keep</p>").await;

    h.tree
        .update_note(&note.id, update("Renamed", None), &unlocked())
        .await
        .unwrap();

    assert_eq!(
        h.store.raw_note_content(&note.id).await.as_deref(),
        Some("<p>keep</p>")
    );
}

#[tokio::test]
async fn test_title_change_event_only_when_title_differs() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Same", "").await;
    let mut rx = h.events.subscribe();

    h.tree
        .update_note(&note.id, update("Same", Some("<p>a</p>")), &unlocked())
        .await
        .unwrap();
    assert!(rx.try_recv().is_err());

    h.tree
        .update_note(&note.id, update("Other", None), &unlocked())
        .await
        .unwrap();
    assert_eq!(
        rx.try_recv().unwrap().payload,
        TreeEvent::NoteTitleChanged {
            note_id: note.id.clone(),
            title: "Other".into(),
        }
    );
}

#[tokio::test]
async fn test_missing_note() {
    let h = Harness::new().await;
    let err = h
        .tree
        .update_note(&NoteId::from("ghost"), update("x", None), &unlocked())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));
}

#[tokio::test]
async fn test_young_note_gets_no_revision() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Fresh", "<p>1</p>").await;
    h.clock.advance(Duration::minutes(9));

    h.tree
        .update_note(&note.id, update("Fresh", Some("<p>2</p>")), &unlocked())
        .await
        .unwrap();

    assert!(h.tree.note_revisions(&note.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_at_most_one_revision_per_interval() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Log", "<p>one</p>").await;

    h.clock.advance(Duration::minutes(11));
    h.tree
        .update_note(&note.id, update("Log 2", Some("<p>two</p>")), &unlocked())
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(1));
    h.tree
        .update_note(&note.id, update("Log 3", Some("<p>three</p>")), &unlocked())
        .await
        .unwrap();

    let revisions = h.tree.note_revisions(&note.id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    let first = &revisions[0];
    assert_eq!(first.title.as_deref(), Some("Log"));
    assert_eq!(first.utc_date_created, start_time() + Duration::minutes(11));
    assert_eq!(first.utc_date_last_edited, start_time());
    assert!(!first.is_protected);
    let content = RevisionRepository::get_content(&h.store, &first.id)
        .await
        .unwrap();
    assert_eq!(content.as_deref(), Some("<p>one</p>"));

    h.clock.advance(Duration::minutes(10));
    h.tree
        .update_note(&note.id, update("Log 4", Some("<p>four</p>")), &unlocked())
        .await
        .unwrap();

    let revisions = h.tree.note_revisions(&note.id).await.unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0].title.as_deref(), Some("Log 3"));
    assert_eq!(revisions[1].title.as_deref(), Some("Log"));
}

#[tokio::test]
async fn test_binary_notes_are_not_revisioned() {
    let h = Harness::new().await;
    let (image, _) = h
        .tree
        .create_note(
            NewNote::new("root", "photo.png", NoteType::Image)
                .with_mime("image/png")
                .with_content("iVBORw0KGgo"),
            &unlocked(),
        )
        .await
        .unwrap();
    h.clock.advance(Duration::hours(1));

    h.tree
        .update_note(&image.id, update("photo-2.png", None), &unlocked())
        .await
        .unwrap();

    assert!(h.tree.note_revisions(&image.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disable_versioning_label() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Scratch", "<p>x</p>").await;
    h.add_attribute(&Attribute::new(
        note.id.clone(),
        AttributeType::Label,
        DISABLE_VERSIONING_LABEL,
        "",
        start_time(),
    ))
    .await;
    h.clock.advance(Duration::hours(1));

    h.tree
        .update_note(&note.id, update("Scratch", Some("<p>y</p>")), &unlocked())
        .await
        .unwrap();

    assert!(h.tree.note_revisions(&note.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_protected_note_needs_open_session() {
    let h = Harness::new().await;
    let (note, _) = h
        .tree
        .create_note(
            NewNote::new("root", "Secret", NoteType::Text)
                .with_protected(true)
                .with_content("<p>s</p>"),
            &unlocked(),
        )
        .await
        .unwrap();

    let err = h
        .tree
        .update_note(
            &note.id,
            NoteUpdate {
                title: "Secret".into(),
                content: Some("<p>t</p>".into()),
                is_protected: true,
            },
            &locked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));

    let (plain, _) = h.text_note(&NoteId::root(), "Plain", "").await;
    let err = h
        .tree
        .update_note(
            &plain.id,
            NoteUpdate {
                title: "Plain".into(),
                content: None,
                is_protected: true,
            },
            &locked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
}

#[tokio::test]
async fn test_protecting_restores_content_and_revisions() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Diary", "<p>day 1</p>").await;

    h.clock.advance(Duration::minutes(11));
    h.tree
        .update_note(&note.id, update("Diary", Some("<p>day 2</p>")), &unlocked())
        .await
        .unwrap();
    let revision = h.tree.note_revisions(&note.id).await.unwrap().remove(0);
    assert!(!revision.is_protected);

    h.tree
        .update_note(
            &note.id,
            NoteUpdate {
                title: "Diary".into(),
                content: None,
                is_protected: true,
            },
            &unlocked(),
        )
        .await
        .unwrap();

    let stored = h.note(&note.id).await;
    assert!(stored.is_protected);
    let raw = h.store.raw_note_content(&note.id).await.unwrap();
    assert_ne!(raw, "<p>day 2</p>");
    assert_eq!(decode(&raw), "<p>day 2</p>");

    let revisions = h.tree.note_revisions(&note.id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert!(revisions[0].is_protected);
    let raw_revision = RevisionRepository::get_content(&h.store, &revisions[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        decode(&raw_revision),
        "<p>day 1</p>"
    );
}
