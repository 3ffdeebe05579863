//! Study session control loop.
//!
//! A session builds the queue from the host's card states and today's
//! counters, hands out the next card, schedules the rating it receives and
//! records it against the daily quotas. Persisting the returned
//! [`CardState`] is left to the host.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::algorithm::{SchedulingResult, Sm2, SpacedRepetitionAlgorithm};
use crate::limits::{study_day, DailyLimitTracker};
use crate::queue::{QueueBuilder, StudyQueue};
use crate::settings::{SettingsWarning, SrsSettings};
use crate::types::{CardId, CardState, CardStatus, ProjectId, Rating};

/// One project's study session for a day.
pub struct StudySession<'t, T: DailyLimitTracker> {
    project_id: ProjectId,
    scheduler: Sm2,
    tracker: &'t T,
    seed: Option<u64>,
}

impl<'t, T: DailyLimitTracker> StudySession<'t, T> {
    pub fn new(project_id: ProjectId, settings: &SrsSettings, tracker: &'t T) -> Self {
        Self {
            project_id,
            scheduler: Sm2::new(settings),
            tracker,
            seed: None,
        }
    }

    /// Fix the new-card shuffle seed.
    ///
    /// Without one the seed is derived from the project and study day, so
    /// the random order is stable within a day and changes between days.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn settings(&self) -> &SrsSettings {
        self.scheduler.settings()
    }

    /// Settings values that were clamped when the session was created.
    pub fn warnings(&self) -> &[SettingsWarning] {
        self.scheduler.warnings()
    }

    /// The study day `now` falls on for this project.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        study_day(now, self.settings().daily_reset_hour)
    }

    /// Build the queue of cards still to study today.
    pub fn queue(&self, cards: &[CardState], now: DateTime<Utc>) -> Result<StudyQueue, T::Error> {
        let today = self.today(now);
        let counters = self.tracker.get_counters(self.project_id, today)?;
        let seed = self.seed.unwrap_or_else(|| self.daily_seed(today));
        Ok(QueueBuilder::new(self.settings())
            .seed(seed)
            .build(cards, &counters, now))
    }

    /// The card to show next, or `None` once the day is complete.
    pub fn next_card(
        &self,
        cards: &[CardState],
        now: DateTime<Utc>,
    ) -> Result<Option<CardId>, T::Error> {
        Ok(self.queue(cards, now)?.first().map(|c| c.card_id))
    }

    /// Schedule a rating and count it against today's quota.
    ///
    /// A rated new card uses one new-card slot and a rated review card one
    /// review slot; learning and relearning cards are not counted.
    pub fn answer(
        &self,
        state: &CardState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<SchedulingResult, T::Error> {
        let result = self.scheduler.schedule(state, rating, now);

        let (new_cards, reviews) = match state.status {
            CardStatus::New => (1, 0),
            CardStatus::Review => (0, 1),
            CardStatus::Learning | CardStatus::Relearning => (0, 0),
        };
        if new_cards + reviews > 0 {
            self.tracker
                .increment(self.project_id, self.today(now), new_cards, reviews)?;
        }

        tracing::debug!(
            project_id = %self.project_id,
            card_id = state.card_id,
            rating = rating.as_str(),
            "answered card"
        );

        Ok(result)
    }

    fn daily_seed(&self, today: NaiveDate) -> u64 {
        (self.project_id.as_u128() as u64) ^ (today.num_days_from_ce() as u64)
    }
}
