//! # arbor-core
//!
//! Core types, traits, and abstractions for the arbor note tree.
//!
//! This crate provides the entity models, the error type, the repository
//! and option traits the mutation engine depends on, and the event bus
//! used to publish tree notifications.

pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod protection;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ArborConfig;
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, TreeEvent};
pub use models::*;
pub use protection::{ContentAccess, ContentCipher};
pub use traits::*;
pub use uuid_utils::{extract_timestamp, new_entity_id, new_v7};
