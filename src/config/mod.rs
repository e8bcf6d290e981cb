//! Configuration module for search-wrapper
//!
//! Handles loading settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

impl Settings {
    /// Load settings from the first file found, falling back to defaults.
    ///
    /// `SEARCH_WRAPPER_SETTINGS_PATH` is checked first, then the working
    /// directory and the user configuration directory. Environment
    /// overrides are merged last.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("SEARCH_WRAPPER_SETTINGS_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                info!("Loading settings from: {}", path.display());
                let mut settings = Settings::from_file(&path)?;
                settings.merge_env();
                return Ok(settings);
            }
        }

        for path in default_paths() {
            if path.exists() {
                info!("Loading settings from: {}", path.display());
                let mut settings = Settings::from_file(&path)?;
                settings.merge_env();
                return Ok(settings);
            }
        }

        info!("No settings file found, using defaults");
        let mut settings = Settings::default();
        settings.merge_env();
        Ok(settings)
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("search-wrapper/settings.yml"));
    }
    paths
}
