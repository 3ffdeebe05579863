//! Spaced repetition algorithm implementations.

pub mod sm2;

use crate::settings::{SettingsWarning, SrsSettings};
use crate::types::{CardId, CardState, Rating};
use chrono::{DateTime, Duration, Utc};

pub use sm2::Sm2;

/// Result of scheduling a card after review.
#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub new_state: CardState,
    pub next_due: DateTime<Utc>,
    /// Settings values that had to be clamped to compute this result.
    pub warnings: Vec<SettingsWarning>,
}

/// Trait for spaced repetition algorithms.
pub trait SpacedRepetitionAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Calculate next review state after a review.
    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult;

    /// Initial state for a new card.
    fn initial_state(&self, card_id: CardId, now: DateTime<Utc>) -> CardState;
}

/// Compute the state that follows `rating` for `state`.
///
/// Pure: identical inputs always give identical output, and the caller is
/// responsible for persisting the returned state.
pub fn apply_rating(
    state: &CardState,
    rating: Rating,
    settings: &SrsSettings,
    now: DateTime<Utc>,
) -> SchedulingResult {
    Sm2::new(settings).schedule(state, rating, now)
}

/// `now + delta`, saturating at the latest representable instant.
pub(crate) fn due_after(now: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    now.checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
