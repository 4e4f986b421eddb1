//! # arbor-jobs
//!
//! Background work for the arbor note tree.
//!
//! This crate provides:
//! - The erasure sweeper, which permanently scrubs notes that have stayed
//!   soft-deleted longer than the configured retention
//! - A start/shutdown handle so the host owns the sweeper's lifetime
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use arbor_db::Database;
//! use arbor_jobs::{ArborConfig, ErasureSweeper, EventBus, SweeperConfig, SystemClock};
//!
//! let db = Database::connect("postgres://...").await?;
//! let sweeper = ErasureSweeper::new(
//!     db.erasure(),
//!     Arc::new(ArborConfig::from_env()?),
//!     Arc::new(SystemClock),
//!     EventBus::default(),
//!     SweeperConfig::from_env(),
//! );
//!
//! let handle = sweeper.start();
//! tokio::signal::ctrl_c().await?;
//! handle.shutdown().await?;
//! ```

pub mod sweeper;

// Re-export core types
pub use arbor_core::*;

pub use sweeper::{ErasureSweeper, SweeperConfig, SweeperHandle};
