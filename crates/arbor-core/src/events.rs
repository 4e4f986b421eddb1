//! Tree notifications and the event bus that distributes them.
//!
//! Mutation operations emit [`TreeEvent`]s fire-and-forget: emission never
//! fails and never waits for a consumer. Each event is wrapped in an
//! [`EventEnvelope`] carrying a UUIDv7 event id, a namespaced type and the
//! entity it concerns, then broadcast to every subscriber.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::models::NoteId;

// ============================================================================
// Event Envelope
// ============================================================================

/// Self-describing wrapper around a [`TreeEvent`].
///
/// ## Wire Format
///
/// ```text
/// {"event_id":"...","event_type":"note.child_created","occurred_at":"...",
///  "entity_type":"note","entity_id":"...","payload_version":1,"payload":{...}}
/// ```
///
/// `payload_version` increments on breaking payload changes; consumers
/// ignore unknown fields.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"note.title_changed"`).
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub payload_version: u32,
    pub payload: TreeEvent,
}

impl EventEnvelope {
    pub fn new(event: TreeEvent, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: crate::uuid_utils::new_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at,
            entity_type: event.entity_type().map(String::from),
            entity_id: event.entity_id().map(|id| id.to_string()),
            payload_version: 1,
            payload: event,
        }
    }
}

// ============================================================================
// Tree Event (domain payloads)
// ============================================================================

/// Notification emitted by tree mutations and background tasks.
///
/// Serialized as JSON with a `type` tag field, e.g.:
/// `{"type":"ChildNoteCreated","child_note_id":"...","parent_note_id":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TreeEvent {
    /// A note was created under a parent.
    ChildNoteCreated {
        child_note_id: NoteId,
        parent_note_id: NoteId,
    },
    /// A note's title was set (on creation or by an update).
    NoteTitleChanged { note_id: NoteId, title: String },
    /// Sibling positions under a parent were renumbered in bulk.
    NoteReordered { parent_note_id: NoteId },
    /// A long-running task made progress.
    TaskProgress {
        task_id: String,
        task_type: String,
        progress_count: u64,
    },
    /// An erasure sweep purged soft-deleted notes.
    NotesErased { note_count: usize },
}

impl TreeEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            TreeEvent::ChildNoteCreated { .. } => "ChildNoteCreated",
            TreeEvent::NoteTitleChanged { .. } => "NoteTitleChanged",
            TreeEvent::NoteReordered { .. } => "NoteReordered",
            TreeEvent::TaskProgress { .. } => "TaskProgress",
            TreeEvent::NotesErased { .. } => "NotesErased",
        }
    }

    /// Returns the namespaced event type for the envelope (e.g., `"note.title_changed"`).
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            TreeEvent::ChildNoteCreated { .. } => "note.child_created",
            TreeEvent::NoteTitleChanged { .. } => "note.title_changed",
            TreeEvent::NoteReordered { .. } => "note.reordered",
            TreeEvent::TaskProgress { .. } => "task.progress",
            TreeEvent::NotesErased { .. } => "erasure.completed",
        }
    }

    /// Returns the entity type this event relates to.
    pub fn entity_type(&self) -> Option<&'static str> {
        match self {
            TreeEvent::ChildNoteCreated { .. }
            | TreeEvent::NoteTitleChanged { .. }
            | TreeEvent::NoteReordered { .. } => Some("note"),
            TreeEvent::TaskProgress { .. } => Some("task"),
            TreeEvent::NotesErased { .. } => None,
        }
    }

    /// Returns the primary entity ID this event relates to.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            TreeEvent::ChildNoteCreated { child_note_id, .. } => Some(child_note_id.as_str()),
            TreeEvent::NoteTitleChanged { note_id, .. } => Some(note_id.as_str()),
            TreeEvent::NoteReordered { parent_note_id } => Some(parent_note_id.as_str()),
            TreeEvent::TaskProgress { task_id, .. } => Some(task_id),
            TreeEvent::NotesErased { .. } => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus for distributing tree events.
///
/// Uses `tokio::sync::broadcast`; slow receivers that fall behind get a
/// `Lagged` error and miss events. Envelopes are stamped by the bus clock,
/// the wall clock unless [`EventBus::with_clock`] says otherwise.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            clock: Arc::new(SystemClock),
        }
    }

    /// Handle on the same channel whose envelopes are stamped by `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: TreeEvent) {
        let envelope = EventEnvelope::new(event, self.clock.now());
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
