//! Core types for the scheduling engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::settings::SrsSettings;

/// Host-assigned flashcard identifier.
pub type CardId = i64;

/// Identifier of the project that owns a set of cards.
pub type ProjectId = Uuid;

/// Cards generated from the same source note share a sibling group.
pub type SiblingGroupId = String;

/// Card learning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Relearning,
    Review,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Relearning => "relearning",
            Self::Review => "review",
        }
    }

    /// Learning and relearning cards walk a step sequence.
    pub fn is_stepping(&self) -> bool {
        matches!(self, Self::Learning | Self::Relearning)
    }
}

impl FromStr for CardStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "relearning" => Ok(Self::Relearning),
            "review" => Ok(Self::Review),
            other => Err(SchedulerError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> crate::Result<Self> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(SchedulerError::InvalidRating(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = SchedulerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl FromStr for Rating {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" | "1" => Ok(Self::Again),
            "hard" | "2" => Ok(Self::Hard),
            "good" | "3" => Ok(Self::Good),
            "easy" | "4" => Ok(Self::Easy),
            _ => Err(SchedulerError::InvalidRating(s.to_string())),
        }
    }
}

/// What happens to a card once it becomes a leech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeechAction {
    /// Exclude the card from every queue until the host unsuspends it.
    Suspend,
    /// Keep the card in rotation, flagged for the host to surface.
    Tag,
}

impl Default for LeechAction {
    fn default() -> Self {
        Self::Suspend
    }
}

impl LeechAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Tag => "tag",
        }
    }
}

impl FromStr for LeechAction {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suspend" => Ok(Self::Suspend),
            "tag" => Ok(Self::Tag),
            other => Err(SchedulerError::InvalidLeechAction(other.to_string())),
        }
    }
}

/// Order in which new cards are introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewCardOrder {
    Random,
    Fifo,
}

impl Default for NewCardOrder {
    fn default() -> Self {
        Self::Random
    }
}

impl NewCardOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Fifo => "fifo",
        }
    }
}

impl FromStr for NewCardOrder {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "fifo" => Ok(Self::Fifo),
            other => Err(SchedulerError::InvalidNewCardOrder(other.to_string())),
        }
    }
}

/// Memory state of a single flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub card_id: CardId,
    pub status: CardStatus,
    pub ease: f64,
    /// Days until the next review; 0 until the card first graduates.
    pub interval: u32,
    /// Position within the learning or relearning step sequence.
    pub learning_step: u32,
    pub repetitions: u32,
    pub lapses: u32,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub is_leech: bool,
    #[serde(default)]
    pub is_suspended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sibling_group_id: Option<SiblingGroupId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl CardState {
    /// Fresh state for a newly inserted flashcard.
    pub fn new(card_id: CardId, settings: &SrsSettings, now: DateTime<Utc>) -> Self {
        Self {
            card_id,
            status: CardStatus::New,
            ease: settings.starting_ease,
            interval: 0,
            learning_step: 0,
            repetitions: 0,
            lapses: 0,
            due_at: now,
            is_leech: false,
            is_suspended: false,
            sibling_group_id: None,
            created_at: now,
            last_reviewed_at: None,
        }
    }

    /// Attach the card to a sibling group.
    pub fn with_sibling_group(mut self, group: impl Into<SiblingGroupId>) -> Self {
        self.sibling_group_id = Some(group.into());
        self
    }

    pub fn is_due(&self, at: DateTime<Utc>) -> bool {
        self.due_at <= at
    }
}

/// Per-project, per-study-day consumption counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStudyCounters {
    pub new_cards_studied: u32,
    pub reviews_completed: u32,
}

impl DailyStudyCounters {
    pub fn new(new_cards_studied: u32, reviews_completed: u32) -> Self {
        Self {
            new_cards_studied,
            reviews_completed,
        }
    }

    /// Remaining new-card quota under `limit`.
    pub fn new_remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.new_cards_studied)
    }

    /// Remaining review quota under `limit`.
    pub fn reviews_remaining(&self, limit: u32) -> u32 {
        limit.saturating_sub(self.reviews_completed)
    }
}
