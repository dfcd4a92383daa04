mod acquisition;
mod analyzer;
mod block;
mod capture_buffer;
mod output;
mod resampler;

#[cfg(test)]
pub(crate) use {acquisition::BlockAssembler, output::OutputMixer};

pub use {
    acquisition::{
        BlockSource, CpalInput, GainControl, InputOpener, SampleSource, input_device_names,
    },
    analyzer::{
        CLIPPING_THRESHOLD, HOT_THRESHOLD, LevelAnalyzer, LevelReading, MeterScaling, MeterZone,
        RollingWaveform, WAVEFORM_CEILING_LEN, WAVEFORM_RETAIN_LEN, analyze, rms_and_peak,
    },
    block::{BLOCK_SIZE, MAX_GAIN, SAMPLE_RATE, SampleBlock, clamp_gain},
    capture_buffer::{CaptureBuffer, CaptureSession, CaptureState, FlushedCapture},
    output::{AudioOutput, OutputHandle, SoundSink, VoiceHandle, output_device_names},
    resampler::Resampler,
};
