//! Tapedeck Core Library
//!
//! Real-time recording pipeline built on CPAL: fixed-size sample blocks with
//! a gain stage, RMS/peak metering and a live waveform, a monitor-then-record
//! capture state machine, 16-bit PCM WAV encoding, and a recording store
//! mirrored to durable storage in the background.
//!
//! # Example
//!
//! ```no_run
//! use tapedeck_core::{
//!     CoreResult, CpalInput, FsDurableStore, MeterScaling, MetronomeSettings, PipelineState,
//!     Recorder, RecordingStore, StopOutcome,
//! };
//!
//! use std::{path::PathBuf, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let store = RecordingStore::from_open_result(
//!         FsDurableStore::open(PathBuf::from("recordings")).await,
//!     );
//!     let mut recorder = Recorder::new(
//!         CpalInput,
//!         PipelineState::new(None, 1.0),
//!         store,
//!         MeterScaling::default(),
//!         MetronomeSettings::default(),
//!     );
//!
//!     recorder.record()?;
//!     for _ in 0..180 {
//!         recorder.tick();
//!         tokio::time::sleep(Duration::from_millis(16)).await;
//!     }
//!
//!     if let StopOutcome::Saved(created) = recorder.stop(|| Some("Take 1".to_string()))? {
//!         println!("Saved {} ({} bytes)", created.recording.name, created.recording.size_bytes());
//!     }
//!     Ok(())
//! }
//! ```

mod audio;
mod codec;
mod error;
mod export;
mod metronome;
mod pipeline;
mod store;

pub use {
    audio::{
        AudioOutput, BLOCK_SIZE, BlockSource, CLIPPING_THRESHOLD, CaptureBuffer, CaptureSession,
        CaptureState, CpalInput, FlushedCapture, GainControl, HOT_THRESHOLD, InputOpener,
        LevelAnalyzer, LevelReading, MAX_GAIN, MeterScaling, MeterZone, OutputHandle, Resampler,
        RollingWaveform, SAMPLE_RATE, SampleBlock, SampleSource, SoundSink, VoiceHandle,
        WAVEFORM_CEILING_LEN, WAVEFORM_RETAIN_LEN, analyze, clamp_gain, input_device_names,
        output_device_names, rms_and_peak,
    },
    codec::{
        DecodedAudio, EncodedAudio, PLAYBACK_WAVEFORM_POINTS, PlaybackWaveform, WAV_HEADER_LEN,
        WAV_MIME_TYPE, decimate, decode_wav, encode_wav, playback_waveform,
        playback_waveform_or_snapshot, quantize,
    },
    error::{AudioError, Result as CoreResult},
    export::{ArchiveWriter, ExportBundle, ExportEntry, MANIFEST_FILE_NAME, TarGzArchive, manifest},
    metronome::{
        CLICK_SECONDS, ClickVoice, MAX_BEATS_PER_BAR, MAX_BPM, MIN_BEATS_PER_BAR, MIN_BPM,
        Metronome, MetronomeSettings, NoteUnit, next_beat, synth_click,
    },
    pipeline::{PipelineState, Playback, Recorder, StopOutcome},
    store::{
        Created, DurableOutcome, DurableRecordingEntry, DurableStore, DurableTicket,
        FsDurableStore, NewDurableEntry, PlaybackLease, Recording,
        RecordingName, RecordingStore, UNSAFE_NAME_CHARS, resolve_name,
    },
};

#[cfg(test)]
pub(crate) use store::MemoryDurableStore;
