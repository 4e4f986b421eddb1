//! Engine configuration.

use async_trait::async_trait;
use chrono::Duration;

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::NoteId;
use crate::traits::OptionSource;

/// Options the mutation engine and the erasure sweeper consume.
#[derive(Debug, Clone)]
pub struct ArborConfig {
    /// Minimum seconds between automatic revision snapshots of a note.
    pub revision_snapshot_interval_secs: i64,
    /// Seconds a note stays soft-deleted before it is erased.
    pub erase_notes_after_secs: i64,
    /// Note currently hoisted in the UI.
    pub hoisted_note_id: NoteId,
}

impl Default for ArborConfig {
    fn default() -> Self {
        Self {
            revision_snapshot_interval_secs: defaults::NOTE_REVISION_SNAPSHOT_INTERVAL_SECS,
            erase_notes_after_secs: defaults::ERASE_NOTES_AFTER_SECS,
            hoisted_note_id: NoteId::root(),
        }
    }
}

impl ArborConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTE_REVISION_SNAPSHOT_INTERVAL_SECS` | `600` | Revision snapshot interval |
    /// | `ERASE_NOTES_AFTER_SECS` | `604800` | Retention before erasure |
    /// | `HOISTED_NOTE_ID` | `root` | Hoisted note |
    pub fn from_env() -> Result<Self> {
        let revision_snapshot_interval_secs = parse_secs(
            "NOTE_REVISION_SNAPSHOT_INTERVAL_SECS",
            defaults::NOTE_REVISION_SNAPSHOT_INTERVAL_SECS,
        )?;
        let erase_notes_after_secs =
            parse_secs("ERASE_NOTES_AFTER_SECS", defaults::ERASE_NOTES_AFTER_SECS)?;
        let hoisted_note_id = std::env::var("HOISTED_NOTE_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(NoteId::from)
            .unwrap_or_else(NoteId::root);

        Ok(Self {
            revision_snapshot_interval_secs,
            erase_notes_after_secs,
            hoisted_note_id,
        })
    }

    /// Set the revision snapshot interval.
    pub fn with_revision_interval(mut self, secs: i64) -> Self {
        self.revision_snapshot_interval_secs = secs;
        self
    }

    /// Set the erasure retention window.
    pub fn with_erasure_retention(mut self, secs: i64) -> Self {
        self.erase_notes_after_secs = secs;
        self
    }

    /// Set the hoisted note.
    pub fn with_hoisted_note(mut self, note_id: NoteId) -> Self {
        self.hoisted_note_id = note_id;
        self
    }
}

fn parse_secs(var: &str, default: i64) -> Result<i64> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<i64>()
                .map_err(|e| Error::Config(format!("{} must be an integer: {}", var, e)))?;
            if secs < 0 {
                return Err(Error::Config(format!("{} must not be negative", var)));
            }
            Ok(secs)
        }
        Err(_) => Ok(default),
    }
}

#[async_trait]
impl OptionSource for ArborConfig {
    async fn revision_snapshot_interval(&self) -> Result<Duration> {
        Ok(Duration::seconds(self.revision_snapshot_interval_secs))
    }

    async fn erasure_retention(&self) -> Result<Duration> {
        Ok(Duration::seconds(self.erase_notes_after_secs))
    }

    async fn hoisted_note_id(&self) -> Result<NoteId> {
        Ok(self.hoisted_note_id.clone())
    }
}
