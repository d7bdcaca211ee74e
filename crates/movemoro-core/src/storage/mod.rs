mod config;
pub mod database;
mod store;

pub use config::{Settings, SETTINGS_VERSION};
pub use database::{Database, ExerciseRecord, SessionRecord};
pub use store::{FileStore, MemoryStore, Store};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `MOVEMORO_DATA_DIR` wins when set. Otherwise `~/.config/movemoro`, or
/// `~/.config/movemoro-dev` with `MOVEMORO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("MOVEMORO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("MOVEMORO_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("movemoro-dev")
            } else {
                base_dir.join("movemoro")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
