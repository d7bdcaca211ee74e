//! Persistence seam used by the session machine.
//!
//! Every method is infallible from the caller's side. A failed write is
//! logged and the session carries on with its in-memory state.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::config::Settings;
use super::database::{Database, ExerciseRecord, SessionRecord};
use crate::error::Result;
use crate::exercise::{CompletionHistory, Exercise};
use crate::session::{Mode, SessionSnapshot};

const HISTORY_KEY: &str = "exercise_history";
const SESSION_KEY: &str = "session_snapshot";

pub trait Store {
    fn load_settings(&self) -> Settings;
    fn save_settings(&self, settings: &Settings);
    fn load_history(&self) -> CompletionHistory;
    fn save_history(&self, history: &CompletionHistory);
    /// A work or break interval ended after `duration_secs`.
    fn record_session(&self, mode: Mode, duration_secs: u64, at: DateTime<Utc>);
    fn record_exercise(&self, exercise: &Exercise, bonus_secs: u64, at: DateTime<Utc>);
    fn save_session(&self, snapshot: &SessionSnapshot);
    fn load_session(&self) -> Option<SessionSnapshot>;
}

impl<S: Store + ?Sized> Store for Rc<S> {
    fn load_settings(&self) -> Settings {
        (**self).load_settings()
    }
    fn save_settings(&self, settings: &Settings) {
        (**self).save_settings(settings)
    }
    fn load_history(&self) -> CompletionHistory {
        (**self).load_history()
    }
    fn save_history(&self, history: &CompletionHistory) {
        (**self).save_history(history)
    }
    fn record_session(&self, mode: Mode, duration_secs: u64, at: DateTime<Utc>) {
        (**self).record_session(mode, duration_secs, at)
    }
    fn record_exercise(&self, exercise: &Exercise, bonus_secs: u64, at: DateTime<Utc>) {
        (**self).record_exercise(exercise, bonus_secs, at)
    }
    fn save_session(&self, snapshot: &SessionSnapshot) {
        (**self).save_session(snapshot)
    }
    fn load_session(&self) -> Option<SessionSnapshot> {
        (**self).load_session()
    }
}

/// Settings in a TOML file, everything else in SQLite.
pub struct FileStore {
    settings_path: PathBuf,
    db: Database,
}

impl FileStore {
    /// Open `settings.toml` and `movemoro.db` under `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory or database cannot be created.
    pub fn open_in(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            settings_path: dir.join("settings.toml"),
            db: Database::open_at(&dir.join("movemoro.db"))?,
        })
    }

    /// Open under [`super::data_dir`].
    ///
    /// # Errors
    /// See [`FileStore::open_in`].
    pub fn open() -> Result<Self> {
        Self::open_in(&super::data_dir()?)
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn clear_session(&self) {
        if let Err(e) = self.db.kv_delete(SESSION_KEY) {
            tracing::warn!(error = %e, "failed to clear session snapshot");
        }
    }

    fn kv_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.db.kv_get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read state");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(key, error = %e, "discarding unreadable state"))
            .ok()
    }

    fn put_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|json| self.db.kv_set(key, &json).map_err(|e| e.to_string()));
        if let Err(error) = result {
            tracing::warn!(key, %error, "failed to save state");
        }
    }
}

impl Store for FileStore {
    fn load_settings(&self) -> Settings {
        Settings::load_from(&self.settings_path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid settings, using defaults");
            Settings::default()
        })
    }

    fn save_settings(&self, settings: &Settings) {
        if let Err(e) = settings.save_to(&self.settings_path) {
            tracing::warn!(error = %e, "failed to save settings");
        }
    }

    fn load_history(&self) -> CompletionHistory {
        self.kv_json(HISTORY_KEY).unwrap_or_default()
    }

    fn save_history(&self, history: &CompletionHistory) {
        self.put_json(HISTORY_KEY, history);
    }

    fn record_session(&self, mode: Mode, duration_secs: u64, at: DateTime<Utc>) {
        if let Err(e) = self.db.record_session(mode, duration_secs, at) {
            tracing::warn!(error = %e, %mode, "failed to record session");
        }
    }

    fn record_exercise(&self, exercise: &Exercise, bonus_secs: u64, at: DateTime<Utc>) {
        if let Err(e) =
            self.db
                .record_exercise(&exercise.id, &exercise.name, exercise.category, bonus_secs, at)
        {
            tracing::warn!(error = %e, exercise = %exercise.id, "failed to record exercise");
        }
    }

    fn save_session(&self, snapshot: &SessionSnapshot) {
        self.put_json(SESSION_KEY, snapshot);
    }

    fn load_session(&self) -> Option<SessionSnapshot> {
        self.kv_json(SESSION_KEY)
    }
}

/// Keeps everything in memory. Cloning yields a handle onto the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryData>>,
}

#[derive(Debug, Default)]
struct MemoryData {
    settings: Settings,
    history: CompletionHistory,
    sessions: Vec<SessionRecord>,
    exercises: Vec<ExerciseRecord>,
    snapshot: Option<SessionSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::default();
        store.inner.borrow_mut().settings = settings;
        store
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.inner.borrow().sessions.clone()
    }

    pub fn exercises(&self) -> Vec<ExerciseRecord> {
        self.inner.borrow().exercises.clone()
    }
}

impl Store for MemoryStore {
    fn load_settings(&self) -> Settings {
        self.inner.borrow().settings.clone()
    }

    fn save_settings(&self, settings: &Settings) {
        self.inner.borrow_mut().settings = settings.clone();
    }

    fn load_history(&self) -> CompletionHistory {
        self.inner.borrow().history.clone()
    }

    fn save_history(&self, history: &CompletionHistory) {
        self.inner.borrow_mut().history = history.clone();
    }

    fn record_session(&self, mode: Mode, duration_secs: u64, at: DateTime<Utc>) {
        let mut data = self.inner.borrow_mut();
        let id = data.sessions.len() as i64 + 1;
        data.sessions.push(SessionRecord {
            id,
            mode,
            duration_secs,
            completed_at: at,
        });
    }

    fn record_exercise(&self, exercise: &Exercise, bonus_secs: u64, at: DateTime<Utc>) {
        let mut data = self.inner.borrow_mut();
        let id = data.exercises.len() as i64 + 1;
        data.exercises.push(ExerciseRecord {
            id,
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            kind: exercise.category,
            bonus_secs,
            completed_at: at,
        });
    }

    fn save_session(&self, snapshot: &SessionSnapshot) {
        self.inner.borrow_mut().snapshot = Some(snapshot.clone());
    }

    fn load_session(&self) -> Option<SessionSnapshot> {
        self.inner.borrow().snapshot.clone()
    }
}
