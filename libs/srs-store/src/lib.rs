//! SQLite persistence for the scheduling engine.
//!
//! Stores the records the scheduler consumes: card states, base and
//! per-project settings, and daily study counters. The store also acts as
//! a [`srs_core::DailyLimitTracker`], so a [`srs_core::StudySession`] can
//! count quota usage straight into the database.

pub mod error;
pub mod repository;
pub mod schema;

pub use error::StoreError;
pub use repository::{SettingsRepository, SqliteStore, StateRepository};
