//! SM-2 card state machine.
//!
//! Anki-flavoured SuperMemo 2: cards walk learning steps measured in
//! minutes, graduate into day-based review intervals, and lapse back into
//! relearning. Ease changes follow Anki's table rather than the classic SM-2
//! quality formula: Good leaves ease alone, Hard and Easy move it by 0.15,
//! and a lapse subtracts the configured penalty.

use super::{due_after, SchedulingResult, SpacedRepetitionAlgorithm};
use crate::leech::check_leech;
use crate::settings::{SettingsWarning, SrsSettings};
use crate::types::{CardId, CardState, CardStatus, Rating};
use chrono::{DateTime, Duration, Utc};

/// Ease lost on a Hard review.
pub const HARD_EASE_DELTA: f64 = 0.15;

/// Ease gained on an Easy review.
pub const EASY_EASE_DELTA: f64 = 0.15;

/// A lone learning step is stretched by this much on Hard.
const SINGLE_STEP_HARD_MULTIPLIER: f64 = 1.5;

/// SM-2 scheduler bound to one project's settings.
#[derive(Debug, Clone)]
pub struct Sm2 {
    settings: SrsSettings,
    warnings: Vec<SettingsWarning>,
}

impl Default for Sm2 {
    fn default() -> Self {
        Self::new(&SrsSettings::default())
    }
}

impl Sm2 {
    /// Build a scheduler, clamping any out-of-range settings.
    pub fn new(settings: &SrsSettings) -> Self {
        let (settings, warnings) = settings.sanitize();
        Self { settings, warnings }
    }

    /// The sanitized settings in effect.
    pub fn settings(&self) -> &SrsSettings {
        &self.settings
    }

    pub fn warnings(&self) -> &[SettingsWarning] {
        &self.warnings
    }

    fn steps_for(&self, status: CardStatus) -> &[f64] {
        match status {
            CardStatus::Relearning => &self.settings.relearning_steps,
            _ => &self.settings.learning_steps,
        }
    }

    /// Learning and relearning transitions.
    fn schedule_step(
        &self,
        mut card: CardState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardState {
        let steps = self.steps_for(card.status);

        // Without steps any passing rating graduates straight away.
        if steps.is_empty() {
            return match rating {
                Rating::Again => {
                    card.learning_step = 0;
                    card.due_at = now;
                    card
                }
                Rating::Easy => self.graduate(card, self.settings.easy_interval, now),
                Rating::Hard | Rating::Good => {
                    self.graduate(card, self.settings.graduating_interval, now)
                }
            };
        }

        match rating {
            Rating::Again => {
                card.learning_step = 0;
                card.due_at = due_after(now, step_delay(steps[0]));
                card
            }
            Rating::Hard => {
                // Repeat the current step; a single step is stretched instead
                // so Hard stays distinguishable from Again.
                let index = (card.learning_step as usize).min(steps.len() - 1);
                let minutes = if steps.len() == 1 {
                    steps[0] * SINGLE_STEP_HARD_MULTIPLIER
                } else {
                    steps[index]
                };
                card.learning_step = index as u32;
                card.due_at = due_after(now, step_delay(minutes));
                card
            }
            Rating::Good => {
                let next = (card.learning_step as usize).saturating_add(1);
                if next >= steps.len() {
                    self.graduate(card, self.settings.graduating_interval, now)
                } else {
                    card.learning_step = next as u32;
                    card.due_at = due_after(now, step_delay(steps[next]));
                    card
                }
            }
            Rating::Easy => self.graduate(card, self.settings.easy_interval, now),
        }
    }

    fn graduate(&self, mut card: CardState, days: u32, now: DateTime<Utc>) -> CardState {
        card.status = CardStatus::Review;
        card.learning_step = 0;
        card.interval = days.clamp(1, self.settings.max_interval);
        card.repetitions = card.repetitions.saturating_add(1);
        card.due_at = due_after(now, Duration::days(i64::from(card.interval)));
        card
    }

    /// Review transitions, including lapses.
    fn schedule_review(
        &self,
        mut card: CardState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardState {
        let s = &self.settings;
        let current = f64::from(card.interval.max(1));
        let interval = match rating {
            Rating::Again => return self.lapse(card, now),
            Rating::Hard => {
                card.ease = self.floor_ease(card.ease - HARD_EASE_DELTA);
                round_days(current * s.hard_interval_factor)
            }
            Rating::Good => round_days(current * card.ease).max(card.interval),
            Rating::Easy => {
                let good = round_days(current * card.ease).max(card.interval);
                card.ease = self.floor_ease(card.ease + EASY_EASE_DELTA);
                round_days(current * card.ease * s.easy_bonus).max(good)
            }
        };

        card.interval = interval.clamp(1, s.max_interval);
        card.repetitions = card.repetitions.saturating_add(1);
        card.due_at = due_after(now, Duration::days(i64::from(card.interval)));
        card
    }

    fn lapse(&self, mut card: CardState, now: DateTime<Utc>) -> CardState {
        let s = &self.settings;
        card.lapses = card.lapses.saturating_add(1);
        card.ease = self.floor_ease(card.ease - s.lapse_ease_penalty);
        card.status = CardStatus::Relearning;
        card.learning_step = 0;
        card.due_at = match s.relearning_steps.first() {
            Some(&minutes) => due_after(now, step_delay(minutes)),
            None => now,
        };
        check_leech(card, s)
    }

    /// Keep ease at permille precision and never below the minimum.
    fn floor_ease(&self, ease: f64) -> f64 {
        let rounded = (ease * 1000.0).round() / 1000.0;
        rounded.max(self.settings.minimum_ease)
    }
}

impl SpacedRepetitionAlgorithm for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self, card_id: CardId, now: DateTime<Utc>) -> CardState {
        CardState::new(card_id, &self.settings, now)
    }

    fn schedule(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> SchedulingResult {
        let mut card = state.clone();
        card.last_reviewed_at = Some(now);

        let mut card = match state.status {
            CardStatus::New => {
                card.status = CardStatus::Learning;
                card.learning_step = 0;
                self.schedule_step(card, rating, now)
            }
            CardStatus::Learning | CardStatus::Relearning => self.schedule_step(card, rating, now),
            CardStatus::Review => self.schedule_review(card, rating, now),
        };
        card.ease = self.floor_ease(card.ease);

        tracing::debug!(
            card_id = card.card_id,
            rating = rating.as_str(),
            from = state.status.as_str(),
            to = card.status.as_str(),
            interval = card.interval,
            ease = card.ease,
            "scheduled card"
        );

        SchedulingResult {
            next_due: card.due_at,
            new_state: card,
            warnings: self.warnings.clone(),
        }
    }
}

fn step_delay(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

fn round_days(days: f64) -> u32 {
    days.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LeechAction;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn review_card() -> CardState {
        CardState {
            status: CardStatus::Review,
            ease: 2.5,
            interval: 10,
            repetitions: 1,
            lapses: 0,
            ..CardState::new(1, &SrsSettings::default(), now())
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn review_again_lapses_into_relearning() {
        let result = Sm2::default().schedule(&review_card(), Rating::Again, now());
        let state = result.new_state;
        assert_eq!(state.status, CardStatus::Relearning);
        assert_close(state.ease, 2.3);
        assert_eq!(state.lapses, 1);
        assert_eq!(state.learning_step, 0);
        assert_eq!(state.repetitions, 1);
        assert_eq!(state.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn review_hard_lowers_ease_and_grows_by_factor() {
        let state = Sm2::default().schedule(&review_card(), Rating::Hard, now()).new_state;
        assert_close(state.ease, 2.35);
        assert_eq!(state.interval, 12);
        assert_eq!(state.repetitions, 2);
        assert_eq!(state.status, CardStatus::Review);
    }

    #[test]
    fn review_good_keeps_ease() {
        let result = Sm2::default().schedule(&review_card(), Rating::Good, now());
        assert_close(result.new_state.ease, 2.5);
        assert_eq!(result.new_state.interval, 25);
        assert_eq!(result.next_due, now() + Duration::days(25));
    }

    #[test]
    fn review_easy_raises_ease_and_applies_bonus() {
        let state = Sm2::default().schedule(&review_card(), Rating::Easy, now()).new_state;
        assert_close(state.ease, 2.65);
        assert_eq!(state.interval, 34);
    }

    #[test]
    fn new_card_enters_learning_on_first_rating() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(1, now());

        let again = sm2.schedule(&state, Rating::Again, now()).new_state;
        assert_eq!(again.status, CardStatus::Learning);
        assert_eq!(again.learning_step, 0);
        assert_eq!(again.due_at, now() + Duration::minutes(1));

        let good = sm2.schedule(&state, Rating::Good, now()).new_state;
        assert_eq!(good.status, CardStatus::Learning);
        assert_eq!(good.learning_step, 1);
        assert_eq!(good.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn new_card_easy_graduates_with_easy_interval() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(1, now());
        let result = sm2.schedule(&state, Rating::Easy, now());
        assert_eq!(result.new_state.status, CardStatus::Review);
        assert_eq!(result.new_state.interval, 4);
        assert_eq!(result.new_state.repetitions, 1);
        assert_eq!(result.next_due, now() + Duration::days(4));
    }

    #[test]
    fn good_through_all_steps_graduates() {
        let sm2 = Sm2::default();
        let state = sm2.initial_state(1, now());
        let first = sm2.schedule(&state, Rating::Good, now()).new_state;
        let second = sm2.schedule(&first, Rating::Good, now()).new_state;
        assert_eq!(second.status, CardStatus::Review);
        assert_eq!(second.interval, 1);
        assert_eq!(second.learning_step, 0);
        assert_eq!(second.due_at, now() + Duration::days(1));
    }

    #[test]
    fn learning_again_resets_step() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(1, now());
        state.status = CardStatus::Learning;
        state.learning_step = 1;
        let result = sm2.schedule(&state, Rating::Again, now()).new_state;
        assert_eq!(result.learning_step, 0);
        assert_eq!(result.status, CardStatus::Learning);
        assert_eq!(result.due_at, now() + Duration::minutes(1));
    }

    #[test]
    fn learning_hard_repeats_current_step() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(1, now());
        state.status = CardStatus::Learning;
        state.learning_step = 1;
        let result = sm2.schedule(&state, Rating::Hard, now()).new_state;
        assert_eq!(result.learning_step, 1);
        assert_eq!(result.due_at, now() + Duration::minutes(10));
    }

    #[test]
    fn hard_on_single_step_stretches_the_step() {
        let sm2 = Sm2::default();
        let mut state = review_card();
        state.status = CardStatus::Relearning;
        let result = sm2.schedule(&state, Rating::Hard, now()).new_state;
        assert_eq!(result.status, CardStatus::Relearning);
        assert_eq!(result.learning_step, 0);
        assert_eq!(result.due_at, now() + Duration::minutes(15));
    }

    #[test]
    fn relearning_good_regraduates_with_graduating_interval() {
        let sm2 = Sm2::default();
        let lapsed = sm2.schedule(&review_card(), Rating::Again, now()).new_state;
        let recovered = sm2.schedule(&lapsed, Rating::Good, now()).new_state;
        assert_eq!(recovered.status, CardStatus::Review);
        assert_eq!(recovered.interval, 1);
        assert_eq!(recovered.repetitions, 2);
        assert_eq!(recovered.lapses, 1);
    }

    #[test]
    fn empty_steps_graduate_on_any_pass() {
        let settings = SrsSettings {
            learning_steps: vec![],
            ..Default::default()
        };
        let sm2 = Sm2::new(&settings);
        let state = sm2.initial_state(1, now());

        for rating in [Rating::Hard, Rating::Good] {
            let result = sm2.schedule(&state, rating, now()).new_state;
            assert_eq!(result.status, CardStatus::Review);
            assert_eq!(result.interval, 1);
        }

        let again = sm2.schedule(&state, Rating::Again, now()).new_state;
        assert_eq!(again.status, CardStatus::Learning);
        assert_eq!(again.due_at, now());
        let passed = sm2.schedule(&again, Rating::Good, now()).new_state;
        assert_eq!(passed.status, CardStatus::Review);
    }

    #[test]
    fn stale_step_index_is_clamped() {
        let sm2 = Sm2::default();
        let mut state = sm2.initial_state(1, now());
        state.status = CardStatus::Learning;
        state.learning_step = 9;
        let hard = sm2.schedule(&state, Rating::Hard, now()).new_state;
        assert_eq!(hard.learning_step, 1);
        let good = sm2.schedule(&state, Rating::Good, now()).new_state;
        assert_eq!(good.status, CardStatus::Review);
    }

    #[test]
    fn interval_clamped_to_max() {
        let settings = SrsSettings {
            max_interval: 30,
            ..Default::default()
        };
        let state = CardState {
            interval: 20,
            ..review_card()
        };
        let result = Sm2::new(&settings).schedule(&state, Rating::Easy, now());
        assert_eq!(result.new_state.interval, 30);
    }

    #[test]
    fn zero_interval_review_is_lifted_to_one_day() {
        let state = CardState {
            interval: 0,
            ease: 1.3,
            ..review_card()
        };
        let result = Sm2::default().schedule(&state, Rating::Hard, now());
        assert_eq!(result.new_state.interval, 1);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        let state = CardState {
            ease: 1.4,
            ..review_card()
        };
        let sm2 = Sm2::default();
        let lapsed = sm2.schedule(&state, Rating::Again, now()).new_state;
        assert_close(lapsed.ease, 1.3);
        let mut hard = CardState {
            ease: 1.3,
            ..review_card()
        };
        hard = sm2.schedule(&hard, Rating::Hard, now()).new_state;
        assert_close(hard.ease, 1.3);
    }

    #[test]
    fn lapse_at_threshold_marks_leech() {
        let settings = SrsSettings {
            leech_threshold: 3,
            leech_action: LeechAction::Tag,
            ..Default::default()
        };
        let state = CardState {
            lapses: 2,
            ..review_card()
        };
        let result = Sm2::new(&settings).schedule(&state, Rating::Again, now()).new_state;
        assert_eq!(result.lapses, 3);
        assert!(result.is_leech);
        assert!(!result.is_suspended);
    }

    #[test]
    fn bad_settings_are_reported_not_fatal() {
        let settings = SrsSettings {
            hard_interval_factor: -2.0,
            ..Default::default()
        };
        let result = Sm2::new(&settings).schedule(&review_card(), Rating::Hard, now());
        assert_eq!(result.new_state.interval, 12);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "hard_interval_factor");
    }

    #[test]
    fn records_review_time() {
        let result = Sm2::default().schedule(&review_card(), Rating::Good, now());
        assert_eq!(result.new_state.last_reviewed_at, Some(now()));
    }
}
