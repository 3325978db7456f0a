//! Application settings loading from `pex.toml`
//!
//! The settings file is optional: a missing file yields the defaults, while a file that
//! exists but cannot be parsed is a configuration error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_PATH: &str = "pex.toml";

/// Configuration structure representing the entire settings file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local snapshot storage
    pub storage: StorageSettings,
    /// One-shot migration behaviour
    pub migration: MigrationSettings,
}

/// Where the local snapshots live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding `products-snapshot` and `sales-snapshot`
    pub snapshot_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from("data/local"),
        }
    }
}

/// Migration tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Debounce between the first loaded snapshot and the migration attempt
    pub grace_period_ms: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 1500,
        }
    }
}

impl MigrationSettings {
    /// Grace period as a [`Duration`]
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read settings file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings file: {e}"),
    })
}

/// Loads settings from `PEX_CONFIG` or `./pex.toml`, using defaults when the file is absent.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("PEX_CONFIG").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
    if Path::new(&path).exists() {
        tracing::debug!("Loading settings from {}", path);
        load_settings(path)
    } else {
        tracing::debug!("No settings file at {}, using defaults", path);
        Ok(Settings::default())
    }
}
