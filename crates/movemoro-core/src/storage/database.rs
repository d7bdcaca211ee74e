//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Completed work and break intervals
//! - Completed exercises, with the bonus time extensions granted
//! - Key-value store for application state (history, snapshots, achievements)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::DatabaseError;
use crate::exercise::Category;
use crate::session::Mode;

/// A completed work or break interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub mode: Mode,
    /// Seconds actually spent before completion or skip.
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
}

/// A completed exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: i64,
    pub exercise_id: String,
    pub name: String,
    pub kind: Category,
    /// Break time granted; zero for snacks.
    pub bonus_secs: u64,
    pub completed_at: DateTime<Utc>,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/movemoro/movemoro.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        Self::open_at(&dir.join("movemoro.db"))
    }

    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                mode         TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS exercises (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise_id  TEXT NOT NULL,
                name         TEXT NOT NULL DEFAULT '',
                kind         TEXT NOT NULL,
                bonus_secs   INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);
            CREATE INDEX IF NOT EXISTS idx_exercises_completed_at ON exercises(completed_at);",
        )
    }

    /// Record a completed interval.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(
        &self,
        mode: Mode,
        duration_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (mode, duration_secs, completed_at) VALUES (?1, ?2, ?3)",
            params![mode.as_str(), duration_secs, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record a completed exercise.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_exercise(
        &self,
        exercise_id: &str,
        name: &str,
        kind: Category,
        bonus_secs: u64,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO exercises (exercise_id, name, kind, bonus_secs, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                exercise_id,
                name,
                kind.as_str(),
                bonus_secs,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All recorded intervals, oldest first.
    pub fn sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mode, duration_secs, completed_at FROM sessions ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, mode, duration_secs, completed_at) = row?;
            let Some(mode) = parse_mode(&mode) else {
                tracing::warn!(id, mode = %mode, "skipping session row with unknown mode");
                continue;
            };
            records.push(SessionRecord {
                id,
                mode,
                duration_secs,
                completed_at: parse_timestamp(&completed_at)?,
            });
        }
        Ok(records)
    }

    /// All recorded exercises, oldest first.
    pub fn exercises(&self) -> Result<Vec<ExerciseRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, name, kind, bonus_secs, completed_at
             FROM exercises ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, exercise_id, name, kind, bonus_secs, completed_at) = row?;
            let kind = match kind.as_str() {
                "snack" => Category::Snack,
                "extension" => Category::Extension,
                other => {
                    tracing::warn!(id, kind = other, "skipping exercise row with unknown kind");
                    continue;
                }
            };
            records.push(ExerciseRecord {
                id,
                exercise_id,
                name,
                kind,
                bonus_secs,
                completed_at: parse_timestamp(&completed_at)?,
            });
        }
        Ok(records)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn parse_mode(s: &str) -> Option<Mode> {
    match s {
        "work" => Some(Mode::Work),
        "break" => Some(Mode::Break),
        "longBreak" => Some(Mode::LongBreak),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{s}': {e}")))
}
