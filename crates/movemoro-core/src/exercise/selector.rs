//! Exercise selection over a catalog and the rolling history.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::catalog::{Catalog, Category, Environment, Exercise};
use super::filter::{eligible, select, SelectionContext, SelectionPreferences};
use super::history::CompletionHistory;

/// How many extension exercises are offered during a break.
pub const DEFAULT_EXTENSION_CHOICES: usize = 3;

/// One office and one home snack exercise.
///
/// A side is `None` only when nothing in the catalog can fill it under the
/// current hard filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnackPair {
    pub office: Option<Exercise>,
    pub home: Option<Exercise>,
}

impl SnackPair {
    pub fn iter(&self) -> impl Iterator<Item = &Exercise> + '_ {
        self.office.iter().chain(self.home.iter())
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.office.is_none() && self.home.is_none()
    }
}

pub struct ExerciseSelector<R: Rng = StdRng> {
    catalog: Catalog,
    history: CompletionHistory,
    preferences: SelectionPreferences,
    /// Pair currently shown to the user, if any.
    current_pair: Option<SnackPair>,
    rng: R,
}

impl ExerciseSelector<StdRng> {
    pub fn new(catalog: Catalog, history: CompletionHistory, preferences: SelectionPreferences) -> Self {
        Self::with_rng(catalog, history, preferences, StdRng::from_entropy())
    }
}

impl<R: Rng> ExerciseSelector<R> {
    pub fn with_rng(
        catalog: Catalog,
        history: CompletionHistory,
        preferences: SelectionPreferences,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            history,
            preferences,
            current_pair: None,
            rng,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &CompletionHistory {
        &self.history
    }

    pub fn preferences(&self) -> &SelectionPreferences {
        &self.preferences
    }

    pub fn set_preferences(&mut self, preferences: SelectionPreferences) {
        self.preferences = preferences;
    }

    pub fn current_pair(&self) -> Option<&SnackPair> {
        self.current_pair.as_ref()
    }

    /// Forget the displayed pair once it is no longer on screen.
    pub fn clear_current_pair(&mut self) {
        self.current_pair = None;
    }

    /// Pick a fresh office/home pair, avoiding the last few completions.
    pub fn select_snack_pair(&mut self) -> SnackPair {
        self.pick_pair(&[])
    }

    /// Replace the pair on screen.
    ///
    /// Exercises in the displayed pair are also avoided, so the result
    /// differs whenever the catalog allows.
    pub fn regenerate_snack_pair(&mut self) -> SnackPair {
        let displayed: Vec<String> = self
            .current_pair
            .iter()
            .flat_map(|p| p.iter().map(|e| e.id.clone()))
            .collect();
        let displayed: Vec<&str> = displayed.iter().map(String::as_str).collect();
        self.pick_pair(&displayed)
    }

    fn pick_pair(&mut self, exclude_ids: &[&str]) -> SnackPair {
        let recent = self.history.recent_ids();
        let mut pick = |environment: Environment| {
            let pool = self.catalog.pool(Category::Snack, Some(environment));
            select(&pool, &self.preferences, &recent, exclude_ids, &mut self.rng).cloned()
        };
        let pair = SnackPair {
            office: pick(Environment::Office),
            home: pick(Environment::Home),
        };

        tracing::debug!(
            office = pair.office.as_ref().map(|e| e.id.as_str()),
            home = pair.home.as_ref().map(|e| e.id.as_str()),
            "selected snack pair"
        );
        self.current_pair = Some(pair.clone());
        pair
    }

    /// Up to `count` distinct extension exercises in random order.
    pub fn select_extension_candidates(&mut self, count: usize) -> Vec<Exercise> {
        let pool = self.catalog.pool(Category::Extension, None);
        let recent = self.history.recent_ids();
        let ctx = SelectionContext {
            preferences: &self.preferences,
            recent_ids: &recent,
            exclude_ids: &[],
        };
        let mut available = eligible(&pool, &ctx);
        available.shuffle(&mut self.rng);
        available.into_iter().take(count).cloned().collect()
    }

    pub fn record_completion(&mut self, exercise: &Exercise, at: DateTime<Utc>) {
        self.history.record(exercise, at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::catalog::{BuiltinCatalog, CatalogSource, Difficulty};
    use crate::exercise::filter::{is_floor_exercise, DifficultyPreference};
    use rand_pcg::Pcg64;
    use std::collections::HashSet;

    fn selector(prefs: SelectionPreferences, seed: u64) -> ExerciseSelector<Pcg64> {
        let catalog = BuiltinCatalog.load_catalog().unwrap();
        ExerciseSelector::with_rng(catalog, CompletionHistory::new(), prefs, Pcg64::seed_from_u64(seed))
    }

    #[test]
    fn snack_pair_has_one_of_each_environment() {
        let mut sel = selector(SelectionPreferences::default(), 1);
        for _ in 0..50 {
            let pair = sel.select_snack_pair();
            let office = pair.office.unwrap();
            let home = pair.home.unwrap();
            assert_eq!(office.environment, Environment::Office);
            assert_eq!(home.environment, Environment::Home);
            assert_eq!(office.category, Category::Snack);
            assert_eq!(home.category, Category::Snack);
        }
    }

    #[test]
    fn regenerate_changes_the_pair() {
        let mut sel = selector(SelectionPreferences::default(), 2);
        for _ in 0..30 {
            let first = sel.select_snack_pair();
            let second = sel.regenerate_snack_pair();
            assert_ne!(first.office, second.office);
            assert_ne!(first.home, second.home);
        }
    }

    #[test]
    fn recent_completions_are_avoided() {
        let mut sel = selector(SelectionPreferences::default(), 3);
        let office_pool: Vec<Exercise> = sel
            .catalog()
            .pool(Category::Snack, Some(Environment::Office))
            .into_iter()
            .cloned()
            .collect();
        for ex in office_pool.iter().take(5) {
            sel.record_completion(ex, Utc::now());
        }
        let recent: HashSet<String> = office_pool.iter().take(5).map(|e| e.id.clone()).collect();
        for _ in 0..40 {
            sel.clear_current_pair();
            let office = sel.select_snack_pair().office.unwrap();
            assert!(!recent.contains(&office.id), "picked recent {}", office.id);
        }
    }

    #[test]
    fn preferences_are_honoured() {
        let prefs = SelectionPreferences {
            difficulty: DifficultyPreference::Easy,
            exclude_floor_exercises: true,
            exclude_equipment: true,
        };
        let mut sel = selector(prefs, 4);
        for _ in 0..40 {
            sel.clear_current_pair();
            for ex in sel.select_snack_pair().iter() {
                assert_eq!(ex.difficulty, Difficulty::Easy);
                assert!(ex.equipment.is_empty());
                assert!(!is_floor_exercise(ex));
            }
        }
    }

    #[test]
    fn extension_candidates_are_distinct_and_bounded() {
        let mut sel = selector(SelectionPreferences::default(), 5);
        let picks = sel.select_extension_candidates(DEFAULT_EXTENSION_CHOICES);
        assert_eq!(picks.len(), DEFAULT_EXTENSION_CHOICES);
        let ids: HashSet<_> = picks.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), picks.len());
        assert!(picks.iter().all(|e| e.category == Category::Extension));

        let all = sel.select_extension_candidates(100);
        assert_eq!(all.len(), sel.catalog().pool(Category::Extension, None).len());
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        let mut sel = ExerciseSelector::with_rng(
            Catalog::default(),
            CompletionHistory::new(),
            SelectionPreferences::default(),
            Pcg64::seed_from_u64(6),
        );
        assert!(sel.select_snack_pair().is_empty());
        assert!(sel.select_extension_candidates(3).is_empty());
    }
}
