mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::Config;
pub use database::Database;
pub use store::AdherenceStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the medtrack data directory, creating it if needed.
///
/// `MEDTRACK_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/medtrack[-dev]/`, with `MEDTRACK_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MEDTRACK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MEDTRACK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("medtrack-dev")
            } else {
                base_dir.join("medtrack")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
