//! Exercise catalog, completion history and selection.

mod catalog;
mod filter;
mod history;
mod selector;

pub use catalog::{
    BuiltinCatalog, Catalog, CatalogSource, Category, Difficulty, Environment, Exercise,
    FileCatalog,
};
pub use filter::{
    eligible, is_floor_exercise, select, DifficultyPreference, OnEmpty, PolicyRule,
    SelectionContext, SelectionPreferences, Stage, RELAXATION_POLICY,
};
pub use history::{CompletionHistory, CompletionRecord, HISTORY_CAPACITY, RECENT_WINDOW};
pub use selector::{ExerciseSelector, SnackPair, DEFAULT_EXTENSION_CHOICES};
