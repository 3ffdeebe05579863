//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the scheduler's SQLite database.
pub const SCHEMA: &str = r#"
-- Card memory state, one row per flashcard
CREATE TABLE IF NOT EXISTS card_states (
    card_id INTEGER PRIMARY KEY,
    project_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new',
    ease REAL NOT NULL,
    interval_days INTEGER NOT NULL DEFAULT 0,
    learning_step INTEGER NOT NULL DEFAULT 0,
    repetitions INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    due_at TEXT NOT NULL,
    is_leech INTEGER NOT NULL DEFAULT 0,
    is_suspended INTEGER NOT NULL DEFAULT 0,
    sibling_group_id TEXT,
    created_at TEXT NOT NULL,
    last_reviewed_at TEXT
);

-- Base settings shared by every project (JSON document)
CREATE TABLE IF NOT EXISTS global_settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    settings_json TEXT NOT NULL
);

-- Per-project overrides (JSON document, every field optional)
CREATE TABLE IF NOT EXISTS project_settings (
    project_id TEXT PRIMARY KEY,
    settings_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Daily quota counters; a new date key starts a fresh day
CREATE TABLE IF NOT EXISTS daily_counters (
    project_id TEXT NOT NULL,
    study_date TEXT NOT NULL,
    new_cards_studied INTEGER NOT NULL DEFAULT 0,
    reviews_completed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (project_id, study_date)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_card_states_project_due ON card_states(project_id, due_at);
"#;

