pub mod achievements;
pub mod config;
pub mod exercises;
pub mod history;
pub mod run;
pub mod stats;

use movemoro_core::exercise::{BuiltinCatalog, CatalogSource, FileCatalog};
use movemoro_core::Settings;

/// The configured catalog file, or the built-in catalog when none is set.
pub fn catalog_source(settings: &Settings) -> Box<dyn CatalogSource> {
    if settings.catalog_path.is_empty() {
        Box::new(BuiltinCatalog)
    } else {
        Box::new(FileCatalog::new(&settings.catalog_path))
    }
}

/// Parse a lowercase value of any core enum through its serde name.
pub fn parse_enum<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("invalid value '{value}'"))
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_secs(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
