//! # arbor-tree
//!
//! The note-tree mutation engine.
//!
//! [`NoteTree`] owns every operation that changes the shape or content of
//! the tree: note creation and positioning, updates with revision
//! snapshots and link bookkeeping, cascading soft-delete and undelete
//! across multi-parent placements, duplication and protection toggling.
//!
//! The engine holds no state of its own. Persistence goes through the
//! repository traits of `arbor-core`, options are read from an
//! [`OptionSource`] once per operation, time comes from an injected
//! [`Clock`], and notifications are published on an [`EventBus`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use arbor_core::{ArborConfig, ContentAccess, EventBus, NoProgress, NoteType, SystemClock};
//! use arbor_tree::{NewNote, NoteTree};
//!
//! let tree = NoteTree::new(
//!     db.repositories(),
//!     Arc::new(ArborConfig::from_env()?),
//!     EventBus::default(),
//!     Arc::new(SystemClock),
//! );
//!
//! let access = ContentAccess::Locked;
//! let (note, branch) = tree
//!     .create_note(NewNote::new("root", "Inbox", NoteType::Text), &access)
//!     .await?;
//! ```

mod content;
mod create;
mod delete;
mod duplicate;
pub mod link_extraction;
mod links;
pub mod progress;
mod protect;
mod revisions;
mod update;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use arbor_core::{defaults, Clock, EventBus, NoteId, OptionSource, Repositories, Result};

pub use create::{CreateTarget, NewNote};
pub use link_extraction::{extract_links, ExtractedLinks};
pub use progress::TaskContext;
pub use update::{ModifiedDates, NoteUpdate};

/// Boxed future for the recursive cascades.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Mutation engine over a note tree.
#[derive(Clone)]
pub struct NoteTree {
    repos: Repositories,
    options: Arc<dyn OptionSource>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl NoteTree {
    pub fn new(
        repos: Repositories,
        options: Arc<dyn OptionSource>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repos,
            options,
            events: events.with_clock(clock.clone()),
            clock,
        }
    }

    /// Bus the engine publishes tree notifications on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Progress context for a cascade, publishing on this engine's bus.
    pub fn task_context(&self, task_type: &str) -> TaskContext {
        TaskContext::new(task_type, self.events.clone())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Position after the last live child of `parent_note_id`.
    async fn next_child_position(&self, parent_note_id: &NoteId) -> Result<i64> {
        Ok(self
            .repos
            .branches
            .max_child_position(parent_note_id)
            .await?
            .map(|max| max + defaults::POSITION_STEP)
            .unwrap_or(0))
    }
}
