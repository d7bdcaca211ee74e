//! Aggregate statistics over recorded sessions and exercises.
//!
//! Day boundaries and hours are taken in the timezone of the `now`
//! argument, so callers pass `Local::now()` and tests pass a fixed offset.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::exercise::Category;
use crate::storage::{ExerciseRecord, SessionRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Completed work intervals.
    pub total_sessions: u64,
    pub today_sessions: u64,
    pub total_focus_secs: u64,
    pub today_focus_secs: u64,
    pub total_break_secs: u64,
    pub exercises_completed: u64,
    pub unique_exercises: u64,
    pub extensions_granted: u64,
    pub bonus_break_secs: u64,
    /// Most work intervals completed on a single day.
    pub best_day_sessions: u64,
    /// Earliest local hour (0-23) a work interval was completed.
    pub earliest_hour: Option<u32>,
    /// Latest local hour (0-23) a work interval was completed.
    pub latest_hour: Option<u32>,
}

impl Stats {
    pub fn from_records<Tz: TimeZone>(
        sessions: &[SessionRecord],
        exercises: &[ExerciseRecord],
        now: &DateTime<Tz>,
    ) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let mut stats = Stats::default();
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for session in sessions {
            if session.mode.is_break() {
                stats.total_break_secs += session.duration_secs;
                continue;
            }
            let local = session.completed_at.with_timezone(&tz);
            let day = local.date_naive();
            let hour = local.hour();

            stats.total_sessions += 1;
            stats.total_focus_secs += session.duration_secs;
            if day == today {
                stats.today_sessions += 1;
                stats.today_focus_secs += session.duration_secs;
            }
            *per_day.entry(day).or_default() += 1;
            stats.earliest_hour = Some(stats.earliest_hour.map_or(hour, |h| h.min(hour)));
            stats.latest_hour = Some(stats.latest_hour.map_or(hour, |h| h.max(hour)));
        }
        stats.best_day_sessions = per_day.values().copied().max().unwrap_or(0);

        let mut unique = HashSet::new();
        for exercise in exercises {
            stats.exercises_completed += 1;
            unique.insert(exercise.exercise_id.as_str());
            if exercise.kind == Category::Extension {
                stats.extensions_granted += 1;
                stats.bonus_break_secs += exercise.bonus_secs;
            }
        }
        stats.unique_exercises = unique.len() as u64;
        stats
    }

    pub fn total_focus_hours(&self) -> f64 {
        self.total_focus_secs as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Mode;
    use chrono::{FixedOffset, Utc};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn session(mode: Mode, secs: u64, when: &str) -> SessionRecord {
        SessionRecord {
            id: 0,
            mode,
            duration_secs: secs,
            completed_at: at(when),
        }
    }

    fn exercise(id: &str, kind: Category, bonus: u64) -> ExerciseRecord {
        ExerciseRecord {
            id: 0,
            exercise_id: id.into(),
            name: id.into(),
            kind,
            bonus_secs: bonus,
            completed_at: at("2026-03-02T10:00:00Z"),
        }
    }

    #[test]
    fn empty_records_give_zeroes() {
        let stats = Stats::from_records(&[], &[], &Utc::now());
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn aggregates_sessions_by_local_day() {
        let sessions = vec![
            session(Mode::Work, 1500, "2026-03-01T23:30:00Z"),
            session(Mode::Break, 300, "2026-03-01T23:35:00Z"),
            session(Mode::Work, 1500, "2026-03-02T09:00:00Z"),
            session(Mode::LongBreak, 900, "2026-03-02T09:20:00Z"),
            session(Mode::Work, 600, "2026-03-02T12:00:00Z"),
        ];
        // UTC+2: every work interval falls on 2 March.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = at("2026-03-02T18:00:00Z").with_timezone(&tz);
        let stats = Stats::from_records(&sessions, &[], &now);

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.today_sessions, 3);
        assert_eq!(stats.best_day_sessions, 3);
        assert_eq!(stats.total_focus_secs, 3600);
        assert_eq!(stats.total_break_secs, 1200);
        assert_eq!(stats.earliest_hour, Some(1));
        assert_eq!(stats.latest_hour, Some(14));
        assert!((stats.total_focus_hours() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn counts_exercises_and_extensions() {
        let exercises = vec![
            exercise("home-lunges", Category::Snack, 0),
            exercise("home-lunges", Category::Snack, 0),
            exercise("ext-yoga-flow", Category::Extension, 240),
        ];
        let stats = Stats::from_records(&[], &exercises, &Utc::now());
        assert_eq!(stats.exercises_completed, 3);
        assert_eq!(stats.unique_exercises, 2);
        assert_eq!(stats.extensions_granted, 1);
        assert_eq!(stats.bonus_break_secs, 240);
    }
}
