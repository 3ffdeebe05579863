//! Study queue construction.
//!
//! Cards are grouped into due learning cards, due reviews and new cards.
//! Learning cards always come first and ignore the daily caps; reviews and
//! new cards are capped by what is left of today's quota and then
//! interleaved one-for-one, starting with a review.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::algorithm::due_after;
use crate::limits::study_day;
use crate::settings::{SettingsWarning, SrsSettings};
use crate::types::{CardId, CardState, CardStatus, DailyStudyCounters, NewCardOrder};

/// Why a card is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Learning,
    Review,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCard {
    pub card_id: CardId,
    pub kind: QueueKind,
}

/// Study queue containing cards to study, in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyQueue {
    pub cards: Vec<QueuedCard>,
    pub learning_count: usize,
    pub review_count: usize,
    pub new_count: usize,
    /// New-card quota left after this queue is studied.
    pub new_remaining: u32,
    /// Review quota left after this queue is studied.
    pub review_remaining: u32,
    /// Cards held back because a sibling was already selected.
    pub buried: Vec<CardId>,
}

impl StudyQueue {
    pub fn card_ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|c| c.card_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn first(&self) -> Option<&QueuedCard> {
        self.cards.first()
    }
}

/// Builds study queues for one project.
#[derive(Debug, Clone)]
pub struct QueueBuilder {
    settings: SrsSettings,
    warnings: Vec<SettingsWarning>,
    seed: u64,
}

impl QueueBuilder {
    pub fn new(settings: &SrsSettings) -> Self {
        let (settings, warnings) = settings.sanitize();
        Self {
            settings,
            warnings,
            seed: 0,
        }
    }

    /// Corrections made to the settings this builder was created with.
    pub fn warnings(&self) -> &[SettingsWarning] {
        &self.warnings
    }

    /// Seed for the shuffle used by [`NewCardOrder::Random`].
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(
        &self,
        cards: &[CardState],
        counters: &DailyStudyCounters,
        now: DateTime<Utc>,
    ) -> StudyQueue {
        let s = &self.settings;
        let review_horizon = if s.review_ahead {
            due_after(now, Duration::days(i64::from(s.review_ahead_days)))
        } else {
            now
        };

        let active = || cards.iter().filter(|c| !c.is_suspended);

        let mut learning: Vec<&CardState> = active()
            .filter(|c| c.status.is_stepping() && c.due_at <= now)
            .collect();
        learning.sort_by_key(|c| (c.due_at, c.card_id));

        let mut reviews: Vec<&CardState> = active()
            .filter(|c| c.status == CardStatus::Review && c.due_at <= review_horizon)
            .collect();
        reviews.sort_by_key(|c| (c.due_at, c.card_id));

        let mut fresh: Vec<&CardState> = active()
            .filter(|c| c.status == CardStatus::New)
            .collect();
        match s.new_card_order {
            NewCardOrder::Fifo => fresh.sort_by_key(|c| (c.created_at, c.card_id)),
            NewCardOrder::Random => {
                // Sort first so the shuffle only depends on the seed.
                fresh.sort_by_key(|c| c.card_id);
                fresh.shuffle(&mut StdRng::seed_from_u64(self.seed));
            }
        }

        let new_quota = counters.new_remaining(s.new_cards_per_day);
        let review_quota = counters.reviews_remaining(s.max_reviews_per_day);

        let mut burier = Burier::new(s.bury_siblings);
        let today = study_day(now, s.daily_reset_hour);
        burier.seed_studied(cards, today, s.daily_reset_hour);
        let learning = burier.take(learning, usize::MAX);
        let reviews = burier.take(reviews, review_quota as usize);
        let fresh = burier.take(fresh, new_quota as usize);

        let mut queue = StudyQueue {
            cards: Vec::with_capacity(learning.len() + reviews.len() + fresh.len()),
            learning_count: learning.len(),
            review_count: reviews.len(),
            new_count: fresh.len(),
            new_remaining: new_quota.saturating_sub(fresh.len() as u32),
            review_remaining: review_quota.saturating_sub(reviews.len() as u32),
            buried: burier.buried,
        };

        queue.cards.extend(learning.into_iter().map(|card_id| QueuedCard {
            card_id,
            kind: QueueKind::Learning,
        }));

        let mut reviews = reviews.into_iter();
        let mut fresh = fresh.into_iter();
        loop {
            let review = reviews.next();
            let new = fresh.next();
            if review.is_none() && new.is_none() {
                break;
            }
            if let Some(card_id) = review {
                queue.cards.push(QueuedCard {
                    card_id,
                    kind: QueueKind::Review,
                });
            }
            if let Some(card_id) = new {
                queue.cards.push(QueuedCard {
                    card_id,
                    kind: QueueKind::New,
                });
            }
        }

        tracing::debug!(
            learning = queue.learning_count,
            review = queue.review_count,
            new = queue.new_count,
            buried = queue.buried.len(),
            "built study queue"
        );

        queue
    }
}

/// Build a queue and return only the card ids, in order.
pub fn build_queue(
    cards: &[CardState],
    settings: &SrsSettings,
    counters: &DailyStudyCounters,
    now: DateTime<Utc>,
    seed: u64,
) -> Vec<CardId> {
    QueueBuilder::new(settings)
        .seed(seed)
        .build(cards, counters, now)
        .card_ids()
}

/// Tracks sibling groups already represented in the day's queue.
///
/// Each group remembers the cards that claimed it; those cards stay
/// eligible, every other sibling is buried.
struct Burier<'a> {
    enabled: bool,
    claimed: HashMap<&'a str, Vec<CardId>>,
    buried: Vec<CardId>,
}

impl<'a> Burier<'a> {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            claimed: HashMap::new(),
            buried: Vec::new(),
        }
    }

    /// Claim groups of cards already studied on `today`.
    fn seed_studied(&mut self, cards: &'a [CardState], today: NaiveDate, daily_reset_hour: u32) {
        if !self.enabled {
            return;
        }
        for card in cards {
            let (Some(group), Some(reviewed)) =
                (card.sibling_group_id.as_deref(), card.last_reviewed_at)
            else {
                continue;
            };
            if study_day(reviewed, daily_reset_hour) == today {
                self.claimed.entry(group).or_default().push(card.card_id);
            }
        }
    }

    /// Select up to `limit` cards in order, skipping buried siblings.
    fn take(&mut self, cards: Vec<&'a CardState>, limit: usize) -> Vec<CardId> {
        let mut selected = Vec::new();
        for card in cards {
            if selected.len() >= limit {
                break;
            }
            if self.admit(card) {
                selected.push(card.card_id);
            }
        }
        selected
    }

    fn admit(&mut self, card: &'a CardState) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(group) = card.sibling_group_id.as_deref() else {
            return true;
        };
        match self.claimed.get(group) {
            Some(owners) if !owners.contains(&card.card_id) => {
                self.buried.push(card.card_id);
                false
            }
            Some(_) => true,
            None => {
                self.claimed.insert(group, vec![card.card_id]);
                true
            }
        }
    }
}
