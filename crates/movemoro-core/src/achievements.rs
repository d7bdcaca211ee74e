//! Achievements unlocked from aggregate [`Stats`].
//!
//! Unlocked achievements are kept in the kv table so each one is announced
//! only once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::stats::Stats;
use crate::storage::Database;

const UNLOCKED_KEY: &str = "achievements";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Achievement {
    FirstSession,
    GettingStarted,
    Dedicated,
    Centurion,
    Legend,
    TimeWarrior,
    FocusMaster,
    ExerciseEnthusiast,
    FitnessFanatic,
    VarietySeeker,
    Overachiever,
    Marathon,
    EarlyBird,
    NightOwl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Milestone,
    Time,
    Exercise,
    Special,
}

impl Achievement {
    pub const ALL: [Achievement; 14] = [
        Achievement::FirstSession,
        Achievement::GettingStarted,
        Achievement::Dedicated,
        Achievement::Centurion,
        Achievement::Legend,
        Achievement::TimeWarrior,
        Achievement::FocusMaster,
        Achievement::ExerciseEnthusiast,
        Achievement::FitnessFanatic,
        Achievement::VarietySeeker,
        Achievement::Overachiever,
        Achievement::Marathon,
        Achievement::EarlyBird,
        Achievement::NightOwl,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Achievement::FirstSession => "first-session",
            Achievement::GettingStarted => "getting-started",
            Achievement::Dedicated => "dedicated",
            Achievement::Centurion => "centurion",
            Achievement::Legend => "legend",
            Achievement::TimeWarrior => "time-warrior",
            Achievement::FocusMaster => "focus-master",
            Achievement::ExerciseEnthusiast => "exercise-enthusiast",
            Achievement::FitnessFanatic => "fitness-fanatic",
            Achievement::VarietySeeker => "variety-seeker",
            Achievement::Overachiever => "overachiever",
            Achievement::Marathon => "marathon",
            Achievement::EarlyBird => "early-bird",
            Achievement::NightOwl => "night-owl",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Achievement::FirstSession => "First Steps",
            Achievement::GettingStarted => "Getting Started",
            Achievement::Dedicated => "Dedicated",
            Achievement::Centurion => "Centurion",
            Achievement::Legend => "Legend",
            Achievement::TimeWarrior => "Time Warrior",
            Achievement::FocusMaster => "Focus Master",
            Achievement::ExerciseEnthusiast => "Exercise Enthusiast",
            Achievement::FitnessFanatic => "Fitness Fanatic",
            Achievement::VarietySeeker => "Variety Seeker",
            Achievement::Overachiever => "Overachiever",
            Achievement::Marathon => "Marathon",
            Achievement::EarlyBird => "Early Bird",
            Achievement::NightOwl => "Night Owl",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstSession => "Complete your first work session",
            Achievement::GettingStarted => "Complete 10 work sessions",
            Achievement::Dedicated => "Complete 50 work sessions",
            Achievement::Centurion => "Complete 100 work sessions",
            Achievement::Legend => "Complete 500 work sessions",
            Achievement::TimeWarrior => "Accumulate 50 hours of focus time",
            Achievement::FocusMaster => "Accumulate 100 hours of focus time",
            Achievement::ExerciseEnthusiast => "Complete 50 exercises",
            Achievement::FitnessFanatic => "Complete 200 exercises",
            Achievement::VarietySeeker => "Complete 20 different exercises",
            Achievement::Overachiever => "Extend your break 10 times",
            Achievement::Marathon => "Complete 10 work sessions in one day",
            Achievement::EarlyBird => "Complete a work session before 8 AM",
            Achievement::NightOwl => "Complete a work session after 10 PM",
        }
    }

    pub fn category(self) -> AchievementCategory {
        match self {
            Achievement::FirstSession
            | Achievement::GettingStarted
            | Achievement::Dedicated
            | Achievement::Centurion
            | Achievement::Legend => AchievementCategory::Milestone,
            Achievement::TimeWarrior | Achievement::FocusMaster => AchievementCategory::Time,
            Achievement::ExerciseEnthusiast
            | Achievement::FitnessFanatic
            | Achievement::VarietySeeker
            | Achievement::Overachiever => AchievementCategory::Exercise,
            Achievement::Marathon | Achievement::EarlyBird | Achievement::NightOwl => {
                AchievementCategory::Special
            }
        }
    }

    pub fn is_met(self, stats: &Stats) -> bool {
        const HOUR: u64 = 3600;
        match self {
            Achievement::FirstSession => stats.total_sessions >= 1,
            Achievement::GettingStarted => stats.total_sessions >= 10,
            Achievement::Dedicated => stats.total_sessions >= 50,
            Achievement::Centurion => stats.total_sessions >= 100,
            Achievement::Legend => stats.total_sessions >= 500,
            Achievement::TimeWarrior => stats.total_focus_secs >= 50 * HOUR,
            Achievement::FocusMaster => stats.total_focus_secs >= 100 * HOUR,
            Achievement::ExerciseEnthusiast => stats.exercises_completed >= 50,
            Achievement::FitnessFanatic => stats.exercises_completed >= 200,
            Achievement::VarietySeeker => stats.unique_exercises >= 20,
            Achievement::Overachiever => stats.extensions_granted >= 10,
            Achievement::Marathon => stats.best_day_sessions >= 10,
            Achievement::EarlyBird => stats.earliest_hour.is_some_and(|h| h < 8),
            Achievement::NightOwl => stats.latest_hour.is_some_and(|h| h >= 22),
        }
    }
}

/// Achievements met by `stats` that are not in `unlocked` yet.
pub fn evaluate(stats: &Stats, unlocked: &BTreeSet<Achievement>) -> Vec<Achievement> {
    Achievement::ALL
        .into_iter()
        .filter(|a| !unlocked.contains(a) && a.is_met(stats))
        .collect()
}

pub fn load_unlocked(db: &Database) -> Result<BTreeSet<Achievement>, DatabaseError> {
    let Some(raw) = db.kv_get(UNLOCKED_KEY)? else {
        return Ok(BTreeSet::new());
    };
    serde_json::from_str(&raw).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
}

pub fn save_unlocked(db: &Database, unlocked: &BTreeSet<Achievement>) -> Result<(), DatabaseError> {
    let raw = serde_json::to_string(unlocked).map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
    db.kv_set(UNLOCKED_KEY, &raw)
}

/// Evaluate against `stats`, persist anything new and return it.
pub fn unlock_new(db: &Database, stats: &Stats) -> Result<Vec<Achievement>, DatabaseError> {
    let mut unlocked = load_unlocked(db)?;
    let fresh = evaluate(stats, &unlocked);
    if !fresh.is_empty() {
        unlocked.extend(fresh.iter().copied());
        save_unlocked(db, &unlocked)?;
        tracing::info!(count = fresh.len(), "achievements unlocked");
    }
    Ok(fresh)
}
