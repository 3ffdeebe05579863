//! Spaced-repetition scheduling engine.
//!
//! Provides:
//! - Per-project scheduler settings with defaults, overrides and clamping
//! - The SM-2 card state machine (learning steps, reviews, lapses)
//! - Leech detection
//! - Daily new/review quota tracking
//! - Study queue construction and a session driver tying it together
//!
//! Everything here is pure and synchronous. Card states, settings and
//! counters are passed in by the host and returned as plain data.

pub mod algorithm;
pub mod error;
pub mod leech;
pub mod limits;
pub mod queue;
pub mod session;
pub mod settings;
pub mod types;

pub use algorithm::{apply_rating, SchedulingResult, Sm2, SpacedRepetitionAlgorithm};
pub use error::{Result, SchedulerError};
pub use leech::check_leech;
pub use limits::{study_day, DailyLimitTracker, InMemoryLimitTracker};
pub use queue::{build_queue, QueueBuilder, QueueKind, QueuedCard, StudyQueue};
pub use session::StudySession;
pub use settings::{SettingsOverride, SettingsWarning, SrsSettings};
pub use types::{
    CardId, CardState, CardStatus, DailyStudyCounters, LeechAction, NewCardOrder, ProjectId,
    Rating, SiblingGroupId,
};
