use crate::config::{DEFAULT_GAIN, default_gain};

use serde::{Deserialize, Serialize};

/// Audio device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Selected input device name (None = default device).
    #[serde(default)]
    pub selected_device: Option<String>,

    /// Output device for playback and metronome (None = default device).
    #[serde(default)]
    pub output_device: Option<String>,

    /// Input gain, 0.0 to 2.0.
    #[serde(default = "default_gain")]
    pub gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            selected_device: None,
            output_device: None,
            gain: DEFAULT_GAIN,
        }
    }
}
