//! Pure selection stages.
//!
//! A pick is made by running a pool through [`RELAXATION_POLICY`] in order.
//! Each stage narrows the pool; when a stage would leave nothing to pick
//! from, its [`OnEmpty`] rule decides whether the stage is skipped
//! (relaxed) or the empty result stands. Floor and equipment exclusions are
//! never relaxed: a user who asked for no floor work gets no suggestion
//! rather than a floor exercise.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::catalog::{Difficulty, Exercise};

/// Name fragments that mark an exercise as done on the floor.
const FLOOR_NAME_KEYWORDS: &[&str] = &[
    "burpees",
    "mountain climbers",
    "push-ups",
    "plank",
    "bicycle crunches",
    "glute bridges",
    "superman",
    "side plank",
    "inchworms",
    "dead bug",
    "leg raises",
    "russian twists",
    "yoga",
    "pilates",
    "stretching",
];

/// Instruction words that mean lying down or floor contact.
const FLOOR_INSTRUCTION_WORDS: &[&str] = &["lie", "lying", "floor"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyPreference {
    #[default]
    Any,
    Easy,
    Medium,
    Hard,
}

impl DifficultyPreference {
    pub fn admits(self, difficulty: Difficulty) -> bool {
        match self {
            DifficultyPreference::Any => true,
            DifficultyPreference::Easy => difficulty == Difficulty::Easy,
            DifficultyPreference::Medium => difficulty == Difficulty::Medium,
            DifficultyPreference::Hard => difficulty == Difficulty::Hard,
        }
    }
}

/// User filtering preferences, fixed for the duration of one pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPreferences {
    #[serde(default)]
    pub difficulty: DifficultyPreference,
    #[serde(default)]
    pub exclude_floor_exercises: bool,
    #[serde(default)]
    pub exclude_equipment: bool,
}

pub fn is_floor_exercise(exercise: &Exercise) -> bool {
    let name = exercise.name.to_lowercase();
    if FLOOR_NAME_KEYWORDS.iter().any(|k| name.contains(k)) {
        return true;
    }
    exercise
        .instructions
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| FLOOR_INSTRUCTION_WORDS.contains(&word))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Drop floor-based exercises when the user excluded them.
    Floor,
    /// Drop exercises needing equipment when the user excluded them.
    Equipment,
    /// Keep only the preferred difficulty.
    Difficulty,
    /// Drop the last few completions.
    Recent,
    /// Drop what is on screen right now, so a regenerate changes something.
    Displayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnEmpty {
    /// Accept the empty pool.
    Keep,
    /// Skip this stage and carry the previous pool forward.
    Relax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRule {
    pub stage: Stage,
    pub on_empty: OnEmpty,
}

/// Stage order and relaxation policy.
///
/// Difficulty is the first preference given up, then recency. Floor and
/// equipment exclusions hold even if nothing survives them.
pub const RELAXATION_POLICY: &[PolicyRule] = &[
    PolicyRule { stage: Stage::Floor, on_empty: OnEmpty::Keep },
    PolicyRule { stage: Stage::Equipment, on_empty: OnEmpty::Keep },
    PolicyRule { stage: Stage::Difficulty, on_empty: OnEmpty::Relax },
    PolicyRule { stage: Stage::Recent, on_empty: OnEmpty::Relax },
    PolicyRule { stage: Stage::Displayed, on_empty: OnEmpty::Relax },
];

/// Everything a stage may consult.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub preferences: &'a SelectionPreferences,
    pub recent_ids: &'a [&'a str],
    pub exclude_ids: &'a [&'a str],
}

impl Stage {
    pub fn admits(self, exercise: &Exercise, ctx: &SelectionContext<'_>) -> bool {
        match self {
            Stage::Floor => !ctx.preferences.exclude_floor_exercises || !is_floor_exercise(exercise),
            Stage::Equipment => !ctx.preferences.exclude_equipment || !exercise.needs_equipment(),
            Stage::Difficulty => ctx.preferences.difficulty.admits(exercise.difficulty),
            Stage::Recent => !ctx.recent_ids.contains(&exercise.id.as_str()),
            Stage::Displayed => !ctx.exclude_ids.contains(&exercise.id.as_str()),
        }
    }

    /// Apply one stage without any fallback.
    pub fn apply<'e>(self, pool: &[&'e Exercise], ctx: &SelectionContext<'_>) -> Vec<&'e Exercise> {
        pool.iter().copied().filter(|e| self.admits(e, ctx)).collect()
    }
}

/// Run `pool` through [`RELAXATION_POLICY`] and return what is eligible.
pub fn eligible<'e>(pool: &[&'e Exercise], ctx: &SelectionContext<'_>) -> Vec<&'e Exercise> {
    let mut current = pool.to_vec();
    for rule in RELAXATION_POLICY {
        let narrowed = rule.stage.apply(&current, ctx);
        if narrowed.is_empty() && !current.is_empty() && rule.on_empty == OnEmpty::Relax {
            tracing::trace!(stage = ?rule.stage, "stage emptied the pool, relaxing");
            continue;
        }
        current = narrowed;
    }
    current
}

/// Pick one exercise uniformly from the eligible part of `pool`.
pub fn select<'e, R: Rng + ?Sized>(
    pool: &[&'e Exercise],
    preferences: &SelectionPreferences,
    recent_ids: &[&str],
    exclude_ids: &[&str],
    rng: &mut R,
) -> Option<&'e Exercise> {
    let ctx = SelectionContext {
        preferences,
        recent_ids,
        exclude_ids,
    };
    eligible(pool, &ctx).choose(rng).copied()
}
