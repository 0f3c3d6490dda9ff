use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{DEFAULT_MIN_CONFIDENCE, DEFAULT_SMOOTHING, DEFAULT_UPDATE_MS, MIN_UPDATE_MS};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Live tuning knobs, read fresh on every update cycle.
///
/// Values are passed through as given: only the update interval is
/// floor-clamped, everything else is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Weight of the previous smoothed score (`alpha`).
    pub smoothing: f64,
    /// Score threshold handed to the face detector.
    pub min_confidence: f64,
    /// Requested milliseconds between detection cycles; 0 means default.
    pub update_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_SMOOTHING,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            update_ms: DEFAULT_UPDATE_MS,
        }
    }
}

impl Settings {
    /// The interval the gate actually uses.
    pub fn effective_interval_ms(&self) -> f64 {
        let requested = if self.update_ms == 0 {
            DEFAULT_UPDATE_MS
        } else {
            self.update_ms
        };
        requested.max(MIN_UPDATE_MS) as f64
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Supplies the settings in effect for the current cycle.
pub trait SettingsSource: Send {
    fn current(&mut self) -> Settings;
}

/// Settings fixed for the whole session (e.g. from command-line flags).
pub struct FixedSettings(pub Settings);

impl SettingsSource for FixedSettings {
    fn current(&mut self) -> Settings {
        self.0
    }
}

/// Re-reads a JSON settings file on every call so edits apply live.
///
/// A missing or malformed file keeps the last good settings.
pub struct JsonFileSettings {
    path: PathBuf,
    last_good: Settings,
    failing: bool,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>, initial: Settings) -> Self {
        Self {
            path: path.into(),
            last_good: initial,
            failing: false,
        }
    }
}

impl SettingsSource for JsonFileSettings {
    fn current(&mut self) -> Settings {
        match Settings::from_json_file(&self.path) {
            Ok(settings) => {
                if self.failing {
                    log::info!("Settings file {} readable again", self.path.display());
                    self.failing = false;
                }
                self.last_good = settings;
            }
            Err(e) => {
                // Warn once per failure streak, the file is polled every cycle.
                if !self.failing {
                    log::warn!("{e}; keeping previous settings");
                    self.failing = true;
                }
            }
        }
        self.last_good
    }
}
