use serde::{Deserialize, Serialize};
use tapedeck_core::{MetronomeSettings, NoteUnit};

/// Metronome defaults restored at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    /// Beats per minute, 40 to 200.
    pub bpm: u32,
    /// Beats in a bar, 1 to 19.
    pub beats_per_bar: u32,
    /// Clicked note value: 2, 4 or 8.
    pub note_unit: NoteUnit,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        MetronomeSettings::default().into()
    }
}

impl MetronomeConfig {
    /// Clamped settings for the metronome.
    pub fn settings(&self) -> MetronomeSettings {
        MetronomeSettings::new(self.bpm, self.beats_per_bar, self.note_unit)
    }
}

impl From<MetronomeSettings> for MetronomeConfig {
    fn from(settings: MetronomeSettings) -> Self {
        Self {
            bpm: settings.bpm(),
            beats_per_bar: settings.beats_per_bar(),
            note_unit: settings.note_unit(),
        }
    }
}
