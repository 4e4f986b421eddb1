//! Error types for arbor.

use thiserror::Error;

use crate::models::{BranchId, NoteId};

/// Result type alias using arbor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for arbor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    /// Branch not found
    #[error("Branch not found: {0}")]
    BranchNotFound(BranchId),

    /// Caller supplied invalid input (blank title, missing type, unknown target).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Attempt to delete a structurally protected note (root or hoisted).
    #[error("Structurally protected: {0}")]
    StructuralProtection(String),

    /// Protected content was needed but the protected session is locked.
    #[error("Content unavailable: {0}")]
    Unavailable(String),

    /// Encryption or decryption of protected content failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
