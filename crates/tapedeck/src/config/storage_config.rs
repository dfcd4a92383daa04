use crate::config::{DEFAULT_PERSISTENT, default_persistent};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where recordings are mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory override (None = platform data directory).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Mirror recordings to disk. `false` keeps them in memory only.
    #[serde(default = "default_persistent")]
    pub persistent: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            persistent: DEFAULT_PERSISTENT,
        }
    }
}
