mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod metronome_config;
mod storage_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config,
    metronome_config::MetronomeConfig, storage_config::StorageConfig,
};

pub(crate) const DEFAULT_GAIN: f32 = 1.0;
pub(crate) const DEFAULT_PERSISTENT: bool = true;

pub(crate) fn default_gain() -> f32 {
    DEFAULT_GAIN
}

pub(crate) fn default_persistent() -> bool {
    DEFAULT_PERSISTENT
}
