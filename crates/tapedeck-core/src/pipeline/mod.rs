mod recorder;
mod state;

pub use {
    recorder::{Playback, Recorder, StopOutcome},
    state::PipelineState,
};
