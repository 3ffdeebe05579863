//! Per-project scheduling configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{LeechAction, NewCardOrder};

/// Tunable parameters of the scheduler.
///
/// Every field has a default, so a partial JSON document deserializes into
/// a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrsSettings {
    /// Learning step delays in minutes.
    pub learning_steps: Vec<f64>,
    /// Relearning step delays in minutes.
    pub relearning_steps: Vec<f64>,
    pub graduating_interval: u32,
    pub easy_interval: u32,
    pub starting_ease: f64,
    pub minimum_ease: f64,
    pub easy_bonus: f64,
    pub hard_interval_factor: f64,
    pub easy_interval_factor: f64,
    /// Carried for configuration compatibility; no formula reads it.
    pub lapse_recovery_factor: f64,
    pub lapse_ease_penalty: f64,
    pub leech_threshold: u32,
    pub leech_action: LeechAction,
    pub new_card_order: NewCardOrder,
    pub review_ahead: bool,
    /// How far ahead review-ahead looks, in days.
    pub review_ahead_days: u32,
    pub bury_siblings: bool,
    pub max_interval: u32,
    pub new_cards_per_day: u32,
    pub max_reviews_per_day: u32,
    /// Hour of day (0-23, UTC) when a new study day begins.
    pub daily_reset_hour: u32,
}

impl Default for SrsSettings {
    fn default() -> Self {
        Self {
            learning_steps: vec![1.0, 10.0],
            relearning_steps: vec![10.0],
            graduating_interval: 1,
            easy_interval: 4,
            starting_ease: 2.5,
            minimum_ease: 1.3,
            easy_bonus: 1.3,
            hard_interval_factor: 1.2,
            easy_interval_factor: 1.3,
            lapse_recovery_factor: 0.5,
            lapse_ease_penalty: 0.2,
            leech_threshold: 8,
            leech_action: LeechAction::default(),
            new_card_order: NewCardOrder::default(),
            review_ahead: false,
            review_ahead_days: 1,
            bury_siblings: false,
            max_interval: 36500,
            new_cards_per_day: 20,
            max_reviews_per_day: 100,
            daily_reset_hour: 0,
        }
    }
}

/// Per-project settings (all fields optional for overrides).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_steps: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relearning_steps: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduating_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easy_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_ease: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_ease: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easy_bonus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_interval_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easy_interval_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lapse_recovery_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lapse_ease_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leech_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leech_action: Option<LeechAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_card_order: Option<NewCardOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_ahead: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_ahead_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bury_siblings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cards_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reviews_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_reset_hour: Option<u32>,
}

/// A settings value that was out of range and has been replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsWarning {
    pub field: &'static str,
    pub message: String,
}

impl SettingsWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        let warning = Self {
            field,
            message: message.into(),
        };
        tracing::warn!(field = warning.field, "{}", warning.message);
        warning
    }
}

impl fmt::Display for SettingsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SrsSettings {
    /// Merge base settings with optional project overrides.
    pub fn merge(base: &SrsSettings, project: Option<&SettingsOverride>) -> Self {
        let Some(p) = project else {
            return base.clone();
        };
        Self {
            learning_steps: p
                .learning_steps
                .clone()
                .unwrap_or_else(|| base.learning_steps.clone()),
            relearning_steps: p
                .relearning_steps
                .clone()
                .unwrap_or_else(|| base.relearning_steps.clone()),
            graduating_interval: p.graduating_interval.unwrap_or(base.graduating_interval),
            easy_interval: p.easy_interval.unwrap_or(base.easy_interval),
            starting_ease: p.starting_ease.unwrap_or(base.starting_ease),
            minimum_ease: p.minimum_ease.unwrap_or(base.minimum_ease),
            easy_bonus: p.easy_bonus.unwrap_or(base.easy_bonus),
            hard_interval_factor: p.hard_interval_factor.unwrap_or(base.hard_interval_factor),
            easy_interval_factor: p.easy_interval_factor.unwrap_or(base.easy_interval_factor),
            lapse_recovery_factor: p.lapse_recovery_factor.unwrap_or(base.lapse_recovery_factor),
            lapse_ease_penalty: p.lapse_ease_penalty.unwrap_or(base.lapse_ease_penalty),
            leech_threshold: p.leech_threshold.unwrap_or(base.leech_threshold),
            leech_action: p.leech_action.unwrap_or(base.leech_action),
            new_card_order: p.new_card_order.unwrap_or(base.new_card_order),
            review_ahead: p.review_ahead.unwrap_or(base.review_ahead),
            review_ahead_days: p.review_ahead_days.unwrap_or(base.review_ahead_days),
            bury_siblings: p.bury_siblings.unwrap_or(base.bury_siblings),
            max_interval: p.max_interval.unwrap_or(base.max_interval),
            new_cards_per_day: p.new_cards_per_day.unwrap_or(base.new_cards_per_day),
            max_reviews_per_day: p.max_reviews_per_day.unwrap_or(base.max_reviews_per_day),
            daily_reset_hour: p.daily_reset_hour.unwrap_or(base.daily_reset_hour),
        }
    }

    /// Clamp out-of-range values to the nearest usable ones.
    ///
    /// Never fails: every replaced value is reported as a warning so the host
    /// can surface the bad configuration without interrupting a session.
    pub fn sanitize(&self) -> (SrsSettings, Vec<SettingsWarning>) {
        let defaults = SrsSettings::default();
        let mut out = self.clone();
        let mut warnings = Vec::new();

        out.learning_steps = valid_steps("learning_steps", &self.learning_steps, &mut warnings);
        out.relearning_steps =
            valid_steps("relearning_steps", &self.relearning_steps, &mut warnings);

        out.graduating_interval = at_least_one(
            "graduating_interval",
            self.graduating_interval,
            &mut warnings,
        );
        out.easy_interval = at_least_one("easy_interval", self.easy_interval, &mut warnings);
        out.max_interval = at_least_one("max_interval", self.max_interval, &mut warnings);
        out.leech_threshold = at_least_one("leech_threshold", self.leech_threshold, &mut warnings);

        out.minimum_ease = positive_ratio(
            "minimum_ease",
            self.minimum_ease,
            defaults.minimum_ease,
            &mut warnings,
        );
        out.starting_ease = positive_ratio(
            "starting_ease",
            self.starting_ease,
            defaults.starting_ease,
            &mut warnings,
        );
        out.easy_bonus = positive_ratio(
            "easy_bonus",
            self.easy_bonus,
            defaults.easy_bonus,
            &mut warnings,
        );
        out.hard_interval_factor = positive_ratio(
            "hard_interval_factor",
            self.hard_interval_factor,
            defaults.hard_interval_factor,
            &mut warnings,
        );
        out.easy_interval_factor = positive_ratio(
            "easy_interval_factor",
            self.easy_interval_factor,
            defaults.easy_interval_factor,
            &mut warnings,
        );
        out.lapse_recovery_factor = positive_ratio(
            "lapse_recovery_factor",
            self.lapse_recovery_factor,
            defaults.lapse_recovery_factor,
            &mut warnings,
        );

        if !self.lapse_ease_penalty.is_finite() {
            warnings.push(SettingsWarning::new(
                "lapse_ease_penalty",
                format!(
                    "{} is not a number, using {}",
                    self.lapse_ease_penalty, defaults.lapse_ease_penalty
                ),
            ));
            out.lapse_ease_penalty = defaults.lapse_ease_penalty;
        } else if self.lapse_ease_penalty < 0.0 {
            warnings.push(SettingsWarning::new(
                "lapse_ease_penalty",
                format!("{} is negative, clamped to 0", self.lapse_ease_penalty),
            ));
            out.lapse_ease_penalty = 0.0;
        }

        if out.starting_ease < out.minimum_ease {
            warnings.push(SettingsWarning::new(
                "starting_ease",
                format!(
                    "{} is below minimum_ease {}, raised to match",
                    out.starting_ease, out.minimum_ease
                ),
            ));
            out.starting_ease = out.minimum_ease;
        }

        if self.daily_reset_hour > 23 {
            warnings.push(SettingsWarning::new(
                "daily_reset_hour",
                format!("{} is not an hour of the day, clamped to 23", self.daily_reset_hour),
            ));
            out.daily_reset_hour = 23;
        }

        (out, warnings)
    }
}

fn valid_steps(
    field: &'static str,
    steps: &[f64],
    warnings: &mut Vec<SettingsWarning>,
) -> Vec<f64> {
    let kept: Vec<f64> = steps
        .iter()
        .copied()
        .filter(|m| m.is_finite() && *m > 0.0)
        .collect();
    if kept.len() != steps.len() {
        warnings.push(SettingsWarning::new(
            field,
            format!("dropped {} non-positive step(s)", steps.len() - kept.len()),
        ));
    }
    kept
}

fn at_least_one(field: &'static str, value: u32, warnings: &mut Vec<SettingsWarning>) -> u32 {
    if value == 0 {
        warnings.push(SettingsWarning::new(field, "0 is out of range, clamped to 1"));
        1
    } else {
        value
    }
}

fn positive_ratio(
    field: &'static str,
    value: f64,
    default: f64,
    warnings: &mut Vec<SettingsWarning>,
) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warnings.push(SettingsWarning::new(
            field,
            format!("{value} is not a positive ratio, using {default}"),
        ));
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let s = SrsSettings::default();
        assert_eq!(s.learning_steps, vec![1.0, 10.0]);
        assert_eq!(s.relearning_steps, vec![10.0]);
        assert_eq!(s.graduating_interval, 1);
        assert_eq!(s.easy_interval, 4);
        assert_eq!(s.leech_threshold, 8);
        assert_eq!(s.leech_action, LeechAction::Suspend);
        assert_eq!(s.new_card_order, NewCardOrder::Random);
        assert_eq!(s.max_interval, 36500);
        assert_eq!(s.new_cards_per_day, 20);
        assert_eq!(s.max_reviews_per_day, 100);
    }

    #[test]
    fn defaults_are_already_sane() {
        let (sanitized, warnings) = SrsSettings::default().sanitize();
        assert!(warnings.is_empty());
        assert_eq!(sanitized, SrsSettings::default());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "new_cards_per_day": 5,
            "leech_action": "tag",
            "learning_steps": [2, 15, 60]
        }"#;
        let settings: SrsSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.new_cards_per_day, 5);
        assert_eq!(settings.leech_action, LeechAction::Tag);
        assert_eq!(settings.learning_steps, vec![2.0, 15.0, 60.0]);
        assert_eq!(settings.max_reviews_per_day, 100);
        assert_eq!(settings.starting_ease, 2.5);
    }

    #[test]
    fn unknown_leech_action_is_rejected() {
        let json = r#"{"leech_action": "delete"}"#;
        assert!(serde_json::from_str::<SrsSettings>(json).is_err());
    }

    #[test]
    fn merge_without_override_is_base() {
        let base = SrsSettings::default();
        assert_eq!(SrsSettings::merge(&base, None), base);
    }

    #[test]
    fn merge_applies_only_present_fields() {
        let base = SrsSettings::default();
        let project = SettingsOverride {
            new_cards_per_day: Some(50),
            bury_siblings: Some(true),
            relearning_steps: Some(vec![5.0, 20.0]),
            ..Default::default()
        };
        let merged = SrsSettings::merge(&base, Some(&project));
        assert_eq!(merged.new_cards_per_day, 50);
        assert!(merged.bury_siblings);
        assert_eq!(merged.relearning_steps, vec![5.0, 20.0]);
        assert_eq!(merged.max_reviews_per_day, base.max_reviews_per_day);
        assert_eq!(merged.learning_steps, base.learning_steps);
    }

    #[test]
    fn override_serializes_only_set_fields() {
        let project = SettingsOverride {
            max_interval: Some(365),
            ..Default::default()
        };
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(json, r#"{"max_interval":365}"#);
    }

    #[test]
    fn sanitize_clamps_zero_intervals() {
        let settings = SrsSettings {
            graduating_interval: 0,
            max_interval: 0,
            leech_threshold: 0,
            ..Default::default()
        };
        let (sanitized, warnings) = settings.sanitize();
        assert_eq!(sanitized.graduating_interval, 1);
        assert_eq!(sanitized.max_interval, 1);
        assert_eq!(sanitized.leech_threshold, 1);
        let fields: Vec<_> = warnings.iter().map(|w| w.field).collect();
        assert_eq!(fields, vec!["graduating_interval", "max_interval", "leech_threshold"]);
    }

    #[test]
    fn sanitize_replaces_bad_ratios() {
        let settings = SrsSettings {
            easy_bonus: -1.0,
            hard_interval_factor: f64::NAN,
            lapse_ease_penalty: -0.5,
            ..Default::default()
        };
        let (sanitized, warnings) = settings.sanitize();
        assert_eq!(sanitized.easy_bonus, 1.3);
        assert_eq!(sanitized.hard_interval_factor, 1.2);
        assert_eq!(sanitized.lapse_ease_penalty, 0.0);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn sanitize_raises_starting_ease_to_minimum() {
        let settings = SrsSettings {
            starting_ease: 1.1,
            minimum_ease: 1.5,
            ..Default::default()
        };
        let (sanitized, warnings) = settings.sanitize();
        assert_eq!(sanitized.starting_ease, 1.5);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "starting_ease");
    }

    #[test]
    fn sanitize_drops_non_positive_steps() {
        let settings = SrsSettings {
            learning_steps: vec![-1.0, 5.0, 0.0, f64::INFINITY],
            ..Default::default()
        };
        let (sanitized, warnings) = settings.sanitize();
        assert_eq!(sanitized.learning_steps, vec![5.0]);
        assert_eq!(warnings[0].to_string(), "learning_steps: dropped 3 non-positive step(s)");
    }

    #[test]
    fn sanitize_keeps_empty_steps() {
        let settings = SrsSettings {
            learning_steps: vec![],
            ..Default::default()
        };
        let (sanitized, warnings) = settings.sanitize();
        assert!(sanitized.learning_steps.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn sanitize_clamps_reset_hour() {
        let settings = SrsSettings {
            daily_reset_hour: 30,
            ..Default::default()
        };
        let (sanitized, _) = settings.sanitize();
        assert_eq!(sanitized.daily_reset_hour, 23);
    }
}
