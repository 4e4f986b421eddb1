//! Centralized default constants for arbor.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// TREE ORDERING
// =============================================================================

/// Gap left between sibling positions so manual reordering rarely has to
/// renumber the whole sibling list.
pub const POSITION_STEP: i64 = 10;

/// Offset of a duplicate from its source so it lands directly after it.
pub const DUPLICATE_POSITION_OFFSET: i64 = 1;

/// Suffix appended to the title of a duplicated note.
pub const DUPLICATE_TITLE_SUFFIX: &str = " (dup)";

// =============================================================================
// REVISIONS
// =============================================================================

/// Minimum seconds between two automatic revision snapshots of a note.
pub const NOTE_REVISION_SNAPSHOT_INTERVAL_SECS: i64 = 600;

// =============================================================================
// ERASURE
// =============================================================================

/// Seconds a note stays soft-deleted before it is erased (7 days).
pub const ERASE_NOTES_AFTER_SECS: i64 = 7 * 24 * 3600;

/// Delay before the first erasure sweep after startup (5 minutes).
pub const ERASURE_FIRST_RUN_DELAY_SECS: u64 = 5 * 60;

/// Interval between erasure sweeps (4 hours).
pub const ERASURE_INTERVAL_SECS: u64 = 4 * 3600;

// =============================================================================
// PROGRESS
// =============================================================================

/// Minimum milliseconds between two progress events of one task.
pub const TASK_PROGRESS_THROTTLE_MS: u64 = 300;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast channel capacity for the event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Maximum number of connections in the pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Connection timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Maximum connection lifetime in seconds.
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;
