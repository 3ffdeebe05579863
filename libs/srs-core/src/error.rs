//! Error types for srs-core.

use thiserror::Error;

/// Result type alias using SchedulerError.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors raised when host data crosses into the scheduler.
///
/// Scheduling itself never fails; these only come from parsing ratings,
/// statuses and setting enums supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("invalid rating: {0}")]
    InvalidRating(String),

    #[error("invalid card status: {0}")]
    InvalidStatus(String),

    #[error("invalid leech action: {0}")]
    InvalidLeechAction(String),

    #[error("invalid new card order: {0}")]
    InvalidNewCardOrder(String),
}
