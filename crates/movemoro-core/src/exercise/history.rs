//! Rolling record of completed exercises.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{Category, Environment, Exercise};

/// Most recent completions kept; older ones fall off the front.
pub const HISTORY_CAPACITY: usize = 50;

/// How many of the latest completions bias selection away from repeats.
pub const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    #[serde(alias = "id")]
    pub exercise_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub category: Option<Category>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only sliding window over completions.
///
/// Stored as a plain JSON array; loading goes through the same cap as
/// recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CompletionRecord>", into = "Vec<CompletionRecord>")]
pub struct CompletionHistory {
    entries: VecDeque<CompletionRecord>,
}

impl From<Vec<CompletionRecord>> for CompletionHistory {
    fn from(records: Vec<CompletionRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<CompletionHistory> for Vec<CompletionRecord> {
    fn from(history: CompletionHistory) -> Self {
        history.entries.into()
    }
}

impl CompletionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored records, keeping only the newest window.
    pub fn from_records(records: impl IntoIterator<Item = CompletionRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.push(record);
        }
        history
    }

    pub fn record(&mut self, exercise: &Exercise, at: DateTime<Utc>) {
        self.push(CompletionRecord {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            environment: Some(exercise.environment),
            category: Some(exercise.category),
            timestamp: at,
        });
    }

    fn push(&mut self, record: CompletionRecord) {
        self.entries.push_back(record);
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Ids of the last `RECENT_WINDOW` completions, oldest first.
    pub fn recent_ids(&self) -> Vec<&str> {
        let skip = self.entries.len().saturating_sub(RECENT_WINDOW);
        self.entries
            .iter()
            .skip(skip)
            .map(|r| r.exercise_id.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &CompletionRecord> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
