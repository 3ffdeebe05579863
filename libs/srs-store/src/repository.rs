//! Repository pattern for scheduler persistence.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use srs_core::{
    CardId, CardState, CardStatus, DailyLimitTracker, DailyStudyCounters, ProjectId,
    SettingsOverride, SrsSettings,
};

use crate::error::StoreError;
use crate::schema::{SCHEMA, SCHEMA_VERSION};

type Result<T> = std::result::Result<T, StoreError>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for card state operations.
pub trait StateRepository {
    fn get_card_state(&self, card_id: CardId) -> Result<Option<CardState>>;
    fn get_project_states(&self, project_id: ProjectId) -> Result<Vec<CardState>>;
    fn save_card_state(&self, project_id: ProjectId, state: &CardState) -> Result<()>;
    fn save_card_states(&self, project_id: ProjectId, states: &[CardState]) -> Result<usize>;
}

/// Repository for settings operations.
pub trait SettingsRepository {
    fn get_global_settings(&self) -> Result<SrsSettings>;
    fn save_global_settings(&self, settings: &SrsSettings) -> Result<()>;
    fn get_project_settings(&self, project_id: ProjectId) -> Result<Option<SettingsOverride>>;
    fn save_project_settings(
        &self,
        project_id: ProjectId,
        settings: &SettingsOverride,
    ) -> Result<()>;
    fn delete_project_settings(&self, project_id: ProjectId) -> Result<()>;
    fn get_effective_settings(&self, project_id: ProjectId) -> Result<SrsSettings>;
}

/// SQLite implementation of repositories.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        tracing::info!(version = SCHEMA_VERSION, "scheduler store initialized");
        Ok(())
    }

    fn write_state(conn: &Connection, project_id: ProjectId, state: &CardState) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO card_states (card_id, project_id, status, ease, interval_days,
                learning_step, repetitions, lapses, due_at, is_leech, is_suspended,
                sibling_group_id, created_at, last_reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                state.card_id,
                project_id.to_string(),
                state.status.as_str(),
                state.ease,
                state.interval,
                state.learning_step,
                state.repetitions,
                state.lapses,
                state.due_at.to_rfc3339(),
                state.is_leech,
                state.is_suspended,
                state.sibling_group_id,
                state.created_at.to_rfc3339(),
                state.last_reviewed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }
}

const STATE_COLUMNS: &str = "card_id, status, ease, interval_days, learning_step, repetitions,
    lapses, due_at, is_leech, is_suspended, sibling_group_id, created_at, last_reviewed_at";

/// Card state exactly as stored, before validation.
struct CardStateRow {
    card_id: CardId,
    status: String,
    ease: f64,
    interval: u32,
    learning_step: u32,
    repetitions: u32,
    lapses: u32,
    due_at: String,
    is_leech: bool,
    is_suspended: bool,
    sibling_group_id: Option<String>,
    created_at: String,
    last_reviewed_at: Option<String>,
}

impl CardStateRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            card_id: row.get(0)?,
            status: row.get(1)?,
            ease: row.get(2)?,
            interval: row.get(3)?,
            learning_step: row.get(4)?,
            repetitions: row.get(5)?,
            lapses: row.get(6)?,
            due_at: row.get(7)?,
            is_leech: row.get(8)?,
            is_suspended: row.get(9)?,
            sibling_group_id: row.get(10)?,
            created_at: row.get(11)?,
            last_reviewed_at: row.get(12)?,
        })
    }
}

impl TryFrom<CardStateRow> for CardState {
    type Error = StoreError;

    fn try_from(row: CardStateRow) -> Result<Self> {
        let status: CardStatus = row.status.parse()?;
        Ok(CardState {
            card_id: row.card_id,
            status,
            ease: row.ease,
            interval: row.interval,
            learning_step: row.learning_step,
            repetitions: row.repetitions,
            lapses: row.lapses,
            due_at: parse_timestamp(&row.due_at)?,
            is_leech: row.is_leech,
            is_suspended: row.is_suspended,
            sibling_group_id: row.sibling_group_id,
            created_at: parse_timestamp(&row.created_at)?,
            last_reviewed_at: row
                .last_reviewed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp {value:?}: {e}")))
}

impl StateRepository for SqliteStore {
    fn get_card_state(&self, card_id: CardId) -> Result<Option<CardState>> {
        let sql = format!("SELECT {STATE_COLUMNS} FROM card_states WHERE card_id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![card_id], CardStateRow::from_row)
            .optional()?;
        row.map(CardState::try_from).transpose()
    }

    fn get_project_states(&self, project_id: ProjectId) -> Result<Vec<CardState>> {
        let sql = format!(
            "SELECT {STATE_COLUMNS} FROM card_states WHERE project_id = ?1 ORDER BY card_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id.to_string()], CardStateRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(CardState::try_from).collect()
    }

    fn save_card_state(&self, project_id: ProjectId, state: &CardState) -> Result<()> {
        Self::write_state(&self.conn, project_id, state)
    }

    fn save_card_states(&self, project_id: ProjectId, states: &[CardState]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for state in states {
            Self::write_state(&tx, project_id, state)?;
        }
        tx.commit()?;
        Ok(states.len())
    }
}

impl SettingsRepository for SqliteStore {
    fn get_global_settings(&self) -> Result<SrsSettings> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT settings_json FROM global_settings WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(SrsSettings::default()),
        }
    }

    fn save_global_settings(&self, settings: &SrsSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO global_settings (id, settings_json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn get_project_settings(&self, project_id: ProjectId) -> Result<Option<SettingsOverride>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT settings_json FROM project_settings WHERE project_id = ?1",
                params![project_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(Into::into)
    }

    fn save_project_settings(
        &self,
        project_id: ProjectId,
        settings: &SettingsOverride,
    ) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO project_settings (project_id, settings_json, updated_at)
             VALUES (?1, ?2, ?3)",
            params![project_id.to_string(), json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_project_settings(&self, project_id: ProjectId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM project_settings WHERE project_id = ?1",
            params![project_id.to_string()],
        )?;
        Ok(())
    }

    fn get_effective_settings(&self, project_id: ProjectId) -> Result<SrsSettings> {
        let global = self.get_global_settings()?;
        let project = self.get_project_settings(project_id)?;
        Ok(SrsSettings::merge(&global, project.as_ref()))
    }
}

impl DailyLimitTracker for SqliteStore {
    type Error = StoreError;

    fn get_counters(&self, project_id: ProjectId, date: NaiveDate) -> Result<DailyStudyCounters> {
        let counters = self
            .conn
            .query_row(
                "SELECT new_cards_studied, reviews_completed FROM daily_counters
                 WHERE project_id = ?1 AND study_date = ?2",
                params![project_id.to_string(), date.format(DATE_FORMAT).to_string()],
                |row| Ok(DailyStudyCounters::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(counters.unwrap_or_default())
    }

    /// Single-statement upsert, so concurrent writers never lose an increment.
    fn increment(
        &self,
        project_id: ProjectId,
        date: NaiveDate,
        new_cards: u32,
        reviews: u32,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO daily_counters
                (project_id, study_date, new_cards_studied, reviews_completed)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, study_date) DO UPDATE SET
                new_cards_studied = new_cards_studied + excluded.new_cards_studied,
                reviews_completed = reviews_completed + excluded.reviews_completed",
            params![
                project_id.to_string(),
                date.format(DATE_FORMAT).to_string(),
                new_cards,
                reviews
            ],
        )?;
        Ok(())
    }
}
