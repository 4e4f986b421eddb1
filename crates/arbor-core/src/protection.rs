//! Capability token for protected content.
//!
//! Operations that may touch protected content take a [`ContentAccess`]
//! argument instead of consulting a process-wide session flag. A locked
//! token makes protected content unreadable; an unlocked token carries the
//! cipher used to encrypt and decrypt it.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Symmetric cipher for protected note and revision content.
///
/// The algorithm belongs to the protected-session subsystem; this crate
/// only needs string in, string out.
pub trait ContentCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Access to protected content for the duration of an operation.
#[derive(Clone, Default)]
pub enum ContentAccess {
    /// Protected session is not open.
    #[default]
    Locked,
    /// Protected session is open.
    Unlocked(Arc<dyn ContentCipher>),
}

impl ContentAccess {
    pub fn unlocked(cipher: impl ContentCipher + 'static) -> Self {
        ContentAccess::Unlocked(Arc::new(cipher))
    }

    pub fn is_accessible(&self) -> bool {
        matches!(self, ContentAccess::Unlocked(_))
    }

    /// Cipher for protected content, or [`Error::Unavailable`] when locked.
    pub fn cipher(&self) -> Result<&dyn ContentCipher> {
        match self {
            ContentAccess::Unlocked(cipher) => Ok(cipher.as_ref()),
            ContentAccess::Locked => Err(Error::Unavailable(
                "protected session is not available".to_string(),
            )),
        }
    }
}

impl fmt::Debug for ContentAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentAccess::Locked => f.write_str("ContentAccess::Locked"),
            ContentAccess::Unlocked(_) => f.write_str("ContentAccess::Unlocked"),
        }
    }
}
