//! Leech detection for chronically failed cards.

use crate::settings::SrsSettings;
use crate::types::{CardState, LeechAction};

/// Flag the card as a leech once its lapses reach the threshold.
///
/// Only ever sets flags. Clearing `is_leech` or `is_suspended` is left to the
/// host application.
pub fn check_leech(mut state: CardState, settings: &SrsSettings) -> CardState {
    if state.lapses < settings.leech_threshold {
        return state;
    }

    if !state.is_leech {
        tracing::debug!(
            card_id = state.card_id,
            lapses = state.lapses,
            action = settings.leech_action.as_str(),
            "card became a leech"
        );
    }
    state.is_leech = true;
    if settings.leech_action == LeechAction::Suspend {
        state.is_suspended = true;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn card_with_lapses(lapses: u32) -> CardState {
        CardState {
            lapses,
            ..CardState::new(1, &SrsSettings::default(), Utc::now())
        }
    }

    #[test]
    fn below_threshold_is_untouched() {
        let settings = SrsSettings::default();
        let state = check_leech(card_with_lapses(7), &settings);
        assert!(!state.is_leech);
        assert!(!state.is_suspended);
    }

    #[test]
    fn threshold_suspends_by_default() {
        let settings = SrsSettings::default();
        let state = check_leech(card_with_lapses(8), &settings);
        assert!(state.is_leech);
        assert!(state.is_suspended);
    }

    #[test]
    fn tag_action_keeps_card_active() {
        let settings = SrsSettings {
            leech_action: LeechAction::Tag,
            ..Default::default()
        };
        let state = check_leech(card_with_lapses(9), &settings);
        assert!(state.is_leech);
        assert!(!state.is_suspended);
    }

    #[test]
    fn never_clears_existing_flags() {
        let settings = SrsSettings {
            leech_threshold: 20,
            ..Default::default()
        };
        let mut card = card_with_lapses(2);
        card.is_leech = true;
        card.is_suspended = true;
        let state = check_leech(card, &settings);
        assert!(state.is_leech);
        assert!(state.is_suspended);
    }
}
