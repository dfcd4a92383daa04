//! Configuration management for tapedeck.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, MetronomeConfig, StorageConfig},
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tapedeck_core::{MeterScaling, clamp_gain};
use tracing::{debug, info, instrument, warn};

const CONFIG_FILE_NAME: &str = "config.toml";
const RECORDINGS_DIR_NAME: &str = "recordings";
const LOGS_DIR_NAME: &str = "logs";

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Audio device and gain configuration.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Meter and waveform scaling.
    #[serde(default)]
    pub meter: MeterScaling,
    /// Durable recording storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Metronome settings.
    #[serde(default)]
    pub metronome: MetronomeConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating the
    /// default file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load and normalize configuration from `path`.
    #[track_caller]
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let mut config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.normalize();

        info!(config_path = ?path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration to the platform config directory.
    #[track_caller]
    pub fn save(&self) -> AppResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Clamp or reset values a hand-edited file may have put out of range.
    pub fn normalize(&mut self) {
        let gain = clamp_gain(self.audio.gain);
        if gain != self.audio.gain {
            warn!(configured = self.audio.gain, gain, "Gain out of range, clamped");
            self.audio.gain = gain;
        }

        if self.meter.normalize() {
            warn!("Meter scaling had invalid values, defaults restored");
        }

        self.metronome = self.metronome.settings().into();
    }

    /// Directory holding the durable recording mirror.
    #[track_caller]
    pub fn recordings_dir(&self) -> AppResult<PathBuf> {
        let base = match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        Ok(base.join(RECORDINGS_DIR_NAME))
    }

    /// Directory for rolling log files.
    #[track_caller]
    pub fn log_dir() -> AppResult<PathBuf> {
        Ok(project_dirs()?.data_dir().join(LOGS_DIR_NAME))
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }
}

#[track_caller]
fn project_dirs() -> AppResult<ProjectDirs> {
    ProjectDirs::from("com", "tapedeck", "Tapedeck").ok_or_else(|| AppError::ConfigError {
        reason: "Failed to get project directories".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}
