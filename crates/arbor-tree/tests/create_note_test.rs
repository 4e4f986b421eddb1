//! Note creation and positioning.

mod helpers;

use chrono::Utc;

use arbor_core::{
    Attribute, AttributeType, BranchId, Error, NoteId, NoteType, TreeEvent,
};
use arbor_tree::NewNote;

use helpers::{locked, start_time, unlocked, Harness};

#[tokio::test]
async fn test_children_are_appended_in_steps_of_ten() {
    let h = Harness::new().await;
    let root = NoteId::root();

    let (_, first) = h.text_note(&root, "First", "").await;
    let (_, second) = h.text_note(&root, "Second", "").await;
    let (_, third) = h.text_note(&root, "Third", "").await;

    assert_eq!(first.position, 0);
    assert_eq!(second.position, 10);
    assert_eq!(third.position, 20);
}

#[tokio::test]
async fn test_explicit_position_and_branch_options() {
    let h = Harness::new().await;
    let (note, branch) = h
        .tree
        .create_note(
            NewNote::new("root", "Projects", NoteType::Book)
                .with_position(55)
                .with_prefix("2024")
                .expanded(),
            &unlocked(),
        )
        .await
        .unwrap();

    assert_eq!(branch.position, 55);
    assert_eq!(branch.prefix.as_deref(), Some("2024"));
    assert!(branch.is_expanded);
    assert_eq!(note.mime, "");
    assert_eq!(h.branch(&branch.id).await, branch);
}

#[tokio::test]
async fn test_mime_follows_type() {
    let h = Harness::new().await;
    let create = |note_type| NewNote::new("root", "n", note_type);

    let (text, _) = h.tree.create_note(create(NoteType::Text), &unlocked()).await.unwrap();
    let (code, _) = h.tree.create_note(create(NoteType::Code), &unlocked()).await.unwrap();
    let (map, _) = h
        .tree
        .create_note(create(NoteType::RelationMap), &unlocked())
        .await
        .unwrap();
    let (js, _) = h
        .tree
        .create_note(
            create(NoteType::Code).with_mime("application/javascript"),
            &unlocked(),
        )
        .await
        .unwrap();

    assert_eq!(text.mime, "text/html");
    assert_eq!(code.mime, "text/plain");
    assert_eq!(map.mime, "application/json");
    assert_eq!(js.mime, "application/javascript");
}

#[tokio::test]
async fn test_file_note_requires_mime() {
    let h = Harness::new().await;

    let err = h
        .tree
        .create_note(NewNote::new("root", "blob", NoteType::File), &unlocked())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let (pdf, _) = h
        .tree
        .create_note(
            NewNote::new("root", "doc.pdf", NoteType::File).with_mime("application/pdf"),
            &unlocked(),
        )
        .await
        .unwrap();
    assert_eq!(pdf.mime, "application/pdf");
}

#[tokio::test]
async fn test_invalid_params_are_rejected() {
    let h = Harness::new().await;

    let blank = h
        .tree
        .create_note(NewNote::new("root", "   ", NoteType::Text), &unlocked())
        .await;
    assert!(matches!(blank, Err(Error::Validation(_))));

    let orphan = h
        .tree
        .create_note(NewNote::new("missing", "x", NoteType::Text), &unlocked())
        .await;
    assert!(matches!(orphan, Err(Error::Validation(_))));

    let mut untyped = NewNote::new("root", "x", NoteType::Text);
    untyped.note_type = None;
    let untyped = h.tree.create_note(untyped, &unlocked()).await;
    assert!(matches!(untyped, Err(Error::Validation(_))));

    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn test_content_is_stored() {
    let h = Harness::new().await;
    let (note, _) = h.text_note(&NoteId::root(), "Hello", "<p>hello</p>").await;

    assert_eq!(note.content_length, 12);
    assert_eq!(
        h.store.raw_note_content(&note.id).await.as_deref(),
        Some("<p>hello</p>")
    );
}

#[tokio::test]
async fn test_child_attributes_are_copied_down() {
    let h = Harness::new().await;
    let (parent, _) = h.text_note(&NoteId::root(), "Journal", "").await;

    let mut template = Attribute::new(
        parent.id.clone(),
        AttributeType::Label,
        "child:template",
        "daily",
        Utc::now(),
    );
    template.position = 7;
    template.is_inheritable = true;
    h.add_attribute(&template).await;
    h.add_attribute(&Attribute::new(
        parent.id.clone(),
        AttributeType::Label,
        "color",
        "blue",
        Utc::now(),
    ))
    .await;

    let (child, _) = h.text_note(&parent.id, "Monday", "").await;
    let attributes = h.live_attributes_of(&child.id).await;

    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].name, "template");
    assert_eq!(attributes[0].value, "daily");
    assert_eq!(attributes[0].position, 7);
    assert!(attributes[0].is_inheritable);
    assert_eq!(attributes[0].attribute_type, AttributeType::Label);
}

#[tokio::test]
async fn test_creation_events() {
    let h = Harness::new().await;
    let mut rx = h.events.subscribe();

    let (note, _) = h.text_note(&NoteId::root(), "Inbox", "").await;

    let created = rx.recv().await.unwrap();
    assert_eq!(
        created.payload,
        TreeEvent::ChildNoteCreated {
            child_note_id: note.id.clone(),
            parent_note_id: NoteId::root(),
        }
    );
    assert_eq!(created.occurred_at, start_time());
    assert_eq!(
        rx.recv().await.unwrap().payload,
        TreeEvent::NoteTitleChanged {
            note_id: note.id.clone(),
            title: "Inbox".into(),
        }
    );
}

#[tokio::test]
async fn test_after_target_shifts_following_siblings() {
    let h = Harness::new().await;
    let root = NoteId::root();
    let (_, before) = h
        .tree
        .create_note(
            NewNote::new(root.clone(), "A", NoteType::Text).with_position(10),
            &unlocked(),
        )
        .await
        .unwrap();
    let (_, reference) = h
        .tree
        .create_note(
            NewNote::new(root.clone(), "B", NoteType::Text).with_position(20),
            &unlocked(),
        )
        .await
        .unwrap();
    let (_, sibling) = h
        .tree
        .create_note(
            NewNote::new(root.clone(), "C", NoteType::Text).with_position(30),
            &unlocked(),
        )
        .await
        .unwrap();
    let mut rx = h.events.subscribe();

    let (_, inserted) = h
        .tree
        .create_note_with_target(
            "after",
            &reference.id,
            NewNote::new("ignored", "B2", NoteType::Text),
            &unlocked(),
        )
        .await
        .unwrap();

    assert_eq!(inserted.position, 30);
    assert_eq!(inserted.parent_note_id, root);
    assert_eq!(h.branch(&sibling.id).await.position, 40);
    assert_eq!(h.branch(&reference.id).await.position, 20);
    assert_eq!(h.branch(&before.id).await.position, 10);

    let mut saw_reorder = false;
    while let Ok(envelope) = rx.try_recv() {
        if envelope.payload == (TreeEvent::NoteReordered { parent_note_id: root.clone() }) {
            saw_reorder = true;
        }
    }
    assert!(saw_reorder);
}

#[tokio::test]
async fn test_rejected_after_insert_leaves_siblings_in_place() {
    let h = Harness::new().await;
    let root = NoteId::root();
    let (_, reference) = h
        .tree
        .create_note(
            NewNote::new(root.clone(), "B", NoteType::Text).with_position(20),
            &unlocked(),
        )
        .await
        .unwrap();
    let (_, sibling) = h
        .tree
        .create_note(
            NewNote::new(root.clone(), "C", NoteType::Text).with_position(30),
            &unlocked(),
        )
        .await
        .unwrap();
    let writes = h.store.write_count();

    let err = h
        .tree
        .create_note_with_target(
            "after",
            &reference.id,
            NewNote::new(root.clone(), "scan.pdf", NoteType::File),
            &unlocked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(h.branch(&sibling.id).await.position, 30);

    let err = h
        .tree
        .create_note_with_target(
            "after",
            &reference.id,
            NewNote::new(root.clone(), "Secret", NoteType::Text).with_protected(true),
            &locked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
    assert_eq!(h.branch(&sibling.id).await.position, 30);
    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn test_into_target_uses_parent_from_params() {
    let h = Harness::new().await;
    let (parent, parent_branch) = h.text_note(&NoteId::root(), "Parent", "").await;

    let (_, branch) = h
        .tree
        .create_note_with_target(
            "into",
            &parent_branch.id,
            NewNote::new(parent.id.clone(), "Child", NoteType::Text),
            &unlocked(),
        )
        .await
        .unwrap();
    assert_eq!(branch.parent_note_id, parent.id);
    assert_eq!(branch.position, 0);
}

#[tokio::test]
async fn test_unknown_target_and_reference() {
    let h = Harness::new().await;

    let err = h
        .tree
        .create_note_with_target(
            "before",
            &BranchId::from("root"),
            NewNote::new("root", "x", NoteType::Text),
            &unlocked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = h
        .tree
        .create_note_with_target(
            "after",
            &BranchId::from("nope"),
            NewNote::new("root", "x", NoteType::Text),
            &unlocked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BranchNotFound(_)));
}

#[tokio::test]
async fn test_protection_is_inherited_when_unlocked() {
    let h = Harness::new().await;
    let (vault, _) = h
        .tree
        .create_note(
            NewNote::new("root", "Vault", NoteType::Text).with_protected(true),
            &unlocked(),
        )
        .await
        .unwrap();
    assert!(vault.is_protected);

    let (secret, _) = h
        .tree
        .create_note(
            NewNote::new(vault.id.clone(), "Secret", NoteType::Text).with_content("pin 1234"),
            &unlocked(),
        )
        .await
        .unwrap();
    assert!(secret.is_protected);

    let raw = h.store.raw_note_content(&secret.id).await.unwrap();
    assert_ne!(raw, "pin 1234");
    assert_eq!(secret.content_length, 8);
}

#[tokio::test]
async fn test_protected_creation_while_locked_fails() {
    let h = Harness::new().await;

    let err = h
        .tree
        .create_note(
            NewNote::new("root", "Secret", NoteType::Text).with_protected(true),
            &locked(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));

    let (plain, _) = h
        .tree
        .create_note(NewNote::new("root", "Plain", NoteType::Text), &locked())
        .await
        .unwrap();
    assert!(!plain.is_protected);
}
