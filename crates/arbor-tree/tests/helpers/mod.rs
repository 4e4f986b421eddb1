//! Shared fixtures for engine tests.
//!
//! Every test runs against a fresh in-memory store seeded with the tree
//! root and a manual clock, so timing-dependent behaviour is deterministic.

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};

use arbor_core::{
    ArborConfig, Attribute, AttributeRepository, Branch, BranchId, BranchRepository,
    ContentAccess, ContentCipher, Error, EventBus, LifecycleFilter, ManualClock, Note, NoteId,
    NoteRepository, NoteType, Result,
};
use arbor_db::MemoryStore;
use arbor_tree::{NewNote, NoteTree};

/// Reversible stand-in for the protected-session cipher.
pub struct Base64Cipher;

impl ContentCipher for Base64Cipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(STANDARD.encode(plaintext))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|e| Error::Crypto(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Crypto(e.to_string()))
    }
}

pub fn unlocked() -> ContentAccess {
    ContentAccess::unlocked(Base64Cipher)
}

pub fn locked() -> ContentAccess {
    ContentAccess::Locked
}

/// Plaintext behind content stored by [`Base64Cipher`].
pub fn decode(stored: &str) -> String {
    Base64Cipher.decrypt(stored).expect("decodable content")
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub store: MemoryStore,
    pub tree: NoteTree,
    pub clock: Arc<ManualClock>,
    pub events: EventBus,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(ArborConfig::default()).await
    }

    pub async fn with_config(config: ArborConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = MemoryStore::with_root(start_time()).await;
        let events = EventBus::new(64);
        let tree = NoteTree::new(
            store.repositories(),
            Arc::new(config),
            events.clone(),
            clock.clone(),
        );
        Self {
            store,
            tree,
            clock,
            events,
        }
    }

    /// Create a text note with `content` under `parent`.
    pub async fn text_note(&self, parent: &NoteId, title: &str, content: &str) -> (Note, Branch) {
        self.tree
            .create_note(
                NewNote::new(parent.clone(), title, NoteType::Text).with_content(content),
                &unlocked(),
            )
            .await
            .expect("create text note")
    }

    pub async fn note(&self, id: &NoteId) -> Note {
        NoteRepository::get(&self.store, id)
            .await
            .unwrap()
            .expect("note exists")
    }

    pub async fn branch(&self, id: &BranchId) -> Branch {
        BranchRepository::get(&self.store, id)
            .await
            .unwrap()
            .expect("branch exists")
    }

    /// Branches of a note in any lifecycle state.
    pub async fn branches_of(&self, id: &NoteId) -> Vec<Branch> {
        BranchRepository::for_note(&self.store, id, LifecycleFilter::Any)
            .await
            .unwrap()
    }

    /// Attributes owned by a note in any lifecycle state.
    pub async fn attributes_of(&self, id: &NoteId) -> Vec<Attribute> {
        self.store
            .owned_by(id, LifecycleFilter::Any)
            .await
            .unwrap()
    }

    pub async fn live_attributes_of(&self, id: &NoteId) -> Vec<Attribute> {
        self.store
            .owned_by(id, LifecycleFilter::Live)
            .await
            .unwrap()
    }

    /// Place an existing note under a second parent.
    pub async fn clone_into(&self, note_id: &NoteId, parent: &NoteId, position: i64) -> Branch {
        let branch = Branch::new(note_id.clone(), parent.clone(), position, start_time());
        BranchRepository::save(&self.store, &branch).await.unwrap();
        branch
    }

    pub async fn add_attribute(&self, attribute: &Attribute) {
        AttributeRepository::save(&self.store, attribute)
            .await
            .unwrap();
    }
}
