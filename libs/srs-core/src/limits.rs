//! Daily new/review quotas per project.
//!
//! Counters live outside the scheduler. The host supplies a
//! [`DailyLimitTracker`] backed by whatever storage it uses; increments
//! for the same `(project, date)` from several devices must be applied
//! atomically by that storage.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use crate::types::{DailyStudyCounters, ProjectId};

/// Source of per-day study counters.
pub trait DailyLimitTracker {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Counters for a project on a study day; zero if nothing was studied.
    fn get_counters(
        &self,
        project_id: ProjectId,
        date: NaiveDate,
    ) -> Result<DailyStudyCounters, Self::Error>;

    /// Add to the counters, creating the day's record on first use.
    fn increment(
        &self,
        project_id: ProjectId,
        date: NaiveDate,
        new_cards: u32,
        reviews: u32,
    ) -> Result<(), Self::Error>;
}

/// Process-local tracker, useful for tests and single-user hosts.
#[derive(Debug, Default)]
pub struct InMemoryLimitTracker {
    counters: Mutex<HashMap<(ProjectId, NaiveDate), DailyStudyCounters>>,
}

impl InMemoryLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DailyLimitTracker for InMemoryLimitTracker {
    type Error = Infallible;

    fn get_counters(
        &self,
        project_id: ProjectId,
        date: NaiveDate,
    ) -> Result<DailyStudyCounters, Self::Error> {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(counters
            .get(&(project_id, date))
            .copied()
            .unwrap_or_default())
    }

    fn increment(
        &self,
        project_id: ProjectId,
        date: NaiveDate,
        new_cards: u32,
        reviews: u32,
    ) -> Result<(), Self::Error> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = counters.entry((project_id, date)).or_default();
        entry.new_cards_studied = entry.new_cards_studied.saturating_add(new_cards);
        entry.reviews_completed = entry.reviews_completed.saturating_add(reviews);
        Ok(())
    }
}

/// Study day that `now` belongs to.
///
/// Before `daily_reset_hour` (UTC) the previous calendar day is still
/// current, so late-night sessions count towards the day they started in.
pub fn study_day(now: DateTime<Utc>, daily_reset_hour: u32) -> NaiveDate {
    if now.hour() < daily_reset_hour {
        (now - Duration::days(1)).date_naive()
    } else {
        now.date_naive()
    }
}
