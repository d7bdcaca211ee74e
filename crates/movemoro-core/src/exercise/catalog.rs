//! Exercise catalog.
//!
//! The catalog is read-only after load. Entries are stored in the JSON
//! shape the catalog files use (`duration`, `breakExtension`, camelCase).

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

const BUILTIN_CATALOG: &str = include_str!("../../data/exercises.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Office,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Short mandatory exercise that unlocks a break.
    Snack,
    /// Optional exercise that earns bonus break time.
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Office => "office",
            Environment::Home => "home",
        }
    }
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Snack => "snack",
            Category::Extension => "extension",
        }
    }
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub environment: Environment,
    pub category: Category,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub equipment: BTreeSet<String>,
    /// Rough time needed to perform the exercise.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    /// Bonus break time granted; only meaningful for extension exercises.
    #[serde(rename = "breakExtension", default)]
    pub break_extension_secs: u64,
    pub instructions: String,
}

impl Exercise {
    pub fn needs_equipment(&self) -> bool {
        !self.equipment.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    exercises: Vec<Exercise>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(exercises: Vec<Exercise>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(exercises.len());
        for ex in &exercises {
            if !seen.insert(ex.id.as_str()) {
                return Err(CatalogError::DuplicateId(ex.id.clone()));
            }
        }
        Ok(Self { exercises })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let exercises: Vec<Exercise> = serde_json::from_str(json)?;
        Self::new(exercises)
    }

    /// Load from a source, degrading to an empty catalog on failure.
    pub fn load_or_empty(source: &dyn CatalogSource) -> Self {
        match source.load_catalog() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, "no exercises available");
                Self::default()
            }
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// All entries of one category, optionally narrowed to one environment.
    pub fn pool(&self, category: Category, environment: Option<Environment>) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|e| e.category == category)
            .filter(|e| environment.map_or(true, |env| e.environment == env))
            .collect()
    }
}

/// Where a catalog comes from.
pub trait CatalogSource {
    fn load_catalog(&self) -> Result<Catalog, CatalogError>;
}

/// The catalog shipped inside the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl CatalogSource for BuiltinCatalog {
    fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_json(BUILTIN_CATALOG)
    }
}

/// A JSON catalog file on disk.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    pub path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalog {
    fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| CatalogError::Unreachable {
            path: self.path.clone(),
            source,
        })?;
        Catalog::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let catalog = BuiltinCatalog.load_catalog().unwrap();
        assert!(!catalog.is_empty());
        assert!(!catalog.pool(Category::Snack, Some(Environment::Office)).is_empty());
        assert!(!catalog.pool(Category::Snack, Some(Environment::Home)).is_empty());
        assert!(!catalog.pool(Category::Extension, None).is_empty());
    }

    #[test]
    fn extension_entries_grant_bonus_time() {
        let catalog = BuiltinCatalog.load_catalog().unwrap();
        for ex in catalog.pool(Category::Extension, None) {
            assert!(ex.break_extension_secs > 0, "{} grants no bonus", ex.id);
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"[
            {"id": "a", "name": "A", "environment": "home", "category": "snack", "difficulty": "easy", "duration": 30, "instructions": ""},
            {"id": "a", "name": "B", "environment": "office", "category": "snack", "difficulty": "easy", "duration": 30, "instructions": ""}
        ]"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Catalog::from_json("{"), Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let source = FileCatalog::new("/definitely/not/here/exercises.json");
        assert!(matches!(source.load_catalog(), Err(CatalogError::Unreachable { .. })));
        assert!(Catalog::load_or_empty(&source).is_empty());
    }
}
