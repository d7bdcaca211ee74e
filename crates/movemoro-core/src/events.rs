use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::{Category, Exercise, SnackPair};
use crate::session::Mode;

/// Everything a presentation layer needs to mirror the session.
///
/// Every intent on the session machine returns the events it caused, in
/// order. The presentation layer holds no authoritative state of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Remaining whole seconds changed.
    Tick {
        remaining_secs: u64,
        progress: f64,
    },
    ModeChanged {
        mode: Mode,
        is_long_break: bool,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: Mode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: Mode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A work interval ended, organically or by skip.
    WorkCompleted {
        worked_secs: u64,
        at: DateTime<Utc>,
    },
    /// Snack exercises gating the next break.
    ExerciseChoices {
        pair: SnackPair,
    },
    ExerciseCompleted {
        exercise_id: String,
        name: String,
        category: Category,
        at: DateTime<Utc>,
    },
    /// Extension exercises offered during a break.
    ExtensionCandidates {
        exercises: Vec<Exercise>,
    },
    ExtensionGranted {
        exercise_id: String,
        before_secs: u64,
        after_secs: u64,
        bonus_secs: u64,
        at: DateTime<Utc>,
    },
    ExtensionClosed,
    BreakCompleted {
        mode: Mode,
        session_count: u32,
        at: DateTime<Utc>,
    },
}
