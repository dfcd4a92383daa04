use crate::{
    AudioError, CoreResult,
    audio::{
        BlockSource, InputOpener, LevelAnalyzer, LevelReading, MeterScaling, Resampler,
        SoundSink, VoiceHandle,
    },
    codec::{PlaybackWaveform, decode_wav, encode_wav, playback_waveform_or_snapshot},
    export::{ArchiveWriter, ExportBundle},
    metronome::{Metronome, MetronomeSettings},
    pipeline::PipelineState,
    store::{Created, DurableStore, PlaybackLease, Recording, RecordingStore, resolve_name},
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{Local, Utc};
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// How a `stop` ended.
#[derive(Debug)]
pub enum StopOutcome {
    /// A recording was encoded and added to the store.
    Saved(Created),
    /// Capturing ended before any block arrived; nothing was saved.
    NothingCaptured,
    /// The pipeline was only monitoring; the input was released.
    Disarmed,
}

/// Result of starting playback.
#[derive(Debug)]
pub struct Playback {
    /// Recording being played.
    pub id: u64,
    /// Waveform to display for it.
    pub waveform: PlaybackWaveform,
    /// Sound queued on the output, if one is attached and decoding worked.
    pub voice: Option<VoiceHandle>,
}

/// Controller owning the whole recording pipeline.
///
/// Single-owner and not thread-safe: the application loop calls
/// [`Recorder::tick`] periodically while [`Recorder::is_active`] and drives
/// every other operation from the same task.
pub struct Recorder<I: InputOpener, S: DurableStore> {
    state: PipelineState,
    opener: I,
    source: Option<I::Source>,
    analyzer: LevelAnalyzer,
    store: RecordingStore<S>,
    metronome: Metronome,
    output: Option<Arc<dyn SoundSink>>,
    playing: Option<VoiceHandle>,
}

impl<I: InputOpener, S: DurableStore> Recorder<I, S> {
    /// Idle recorder.
    pub fn new(
        opener: I,
        state: PipelineState,
        store: RecordingStore<S>,
        scaling: MeterScaling,
        metronome: MetronomeSettings,
    ) -> Self {
        Self {
            state,
            opener,
            source: None,
            analyzer: LevelAnalyzer::new(scaling),
            store,
            metronome: Metronome::new(metronome),
            output: None,
            playing: None,
        }
    }

    /// Pipeline settings and capture state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Whether Armed or Capturing, i.e. whether `tick` has work to do.
    pub fn is_active(&self) -> bool {
        self.state.capture.is_active()
    }

    /// Whether blocks are being kept.
    pub fn is_capturing(&self) -> bool {
        self.state.capture.is_capturing()
    }

    /// Idle → Armed: open the selected input and start metering.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless Idle. `DeviceUnavailable` / `DeviceError`
    /// if the input cannot be opened; the pipeline stays Idle and holds no
    /// device.
    #[track_caller]
    #[instrument(skip(self), fields(device = ?self.state.selected_device))]
    pub fn arm(&mut self) -> CoreResult<()> {
        self.state.capture.arm()?;

        match self
            .opener
            .open(self.state.selected_device.as_deref(), self.state.gain.clone())
        {
            Ok(source) => {
                info!(device = %source.device_name(), "Monitoring started");
                self.source = Some(source);
                self.analyzer.reset();
                Ok(())
            }
            Err(e) => {
                // Roll back so nothing looks armed without a device.
                let _ = self.state.capture.disarm();
                Err(e)
            }
        }
    }

    /// Armed → Capturing. From Idle, arms first.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when already Capturing, or any [`Recorder::arm`]
    /// error.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn record(&mut self) -> CoreResult<()> {
        if !self.state.capture.is_active() {
            self.arm()?;
        }

        let sample_rate = self
            .source
            .as_ref()
            .map_or(crate::audio::SAMPLE_RATE, |s| s.sample_rate());
        self.state.capture.start(sample_rate)?;

        Ok(())
    }

    /// Armed → Idle without recording.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless Armed.
    #[track_caller]
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.state.capture.disarm()?;
        self.release_input();
        self.analyzer.reset();
        info!("Monitoring cancelled");
        Ok(())
    }

    /// Pull every pending block through the analyzer and, when Capturing,
    /// into the capture session. Returns the newest reading.
    pub fn tick(&mut self) -> Option<LevelReading> {
        self.store.sync_durable();

        let source = self.source.as_mut()?;
        let mut reading = None;

        for block in source.drain() {
            reading = Some(self.analyzer.process(&block));
            self.state.capture.accept(block);
        }

        reading
    }

    /// Newest reading, if any block has been analyzed since arming.
    pub fn last_reading(&self) -> Option<LevelReading> {
        self.analyzer.last_reading()
    }

    /// Live rolling waveform.
    pub fn waveform(&self) -> &[f32] {
        self.analyzer.waveform().points()
    }

    /// Time since capturing started; `None` unless Capturing.
    pub fn elapsed(&self) -> Option<Duration> {
        match self.state.capture.state() {
            crate::audio::CaptureState::Capturing(session) => {
                (Utc::now() - session.started_at).to_std().ok()
            }
            _ => None,
        }
    }

    /// End the current cycle.
    ///
    /// Capturing: drains remaining blocks, releases the input, stops the
    /// metronome, encodes the capture and stores it under the name returned
    /// by `prompt` (re-asked while blank, timestamp fallback on `None`).
    /// Armed: releases the input.
    ///
    /// The input is released on every path, including errors.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when Idle, `EncodingFailure` when the capture is
    /// too large for a WAV container.
    #[track_caller]
    #[instrument(skip(self, prompt))]
    pub fn stop<F>(&mut self, prompt: F) -> CoreResult<StopOutcome>
    where
        F: FnMut() -> Option<String>,
    {
        if !self.state.capture.is_active() {
            return Err(AudioError::InvalidTransition {
                action: "stop",
                state: self.state.mode(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let _ = self.tick();
        self.release_input();
        self.metronome.stop();

        let Some(flushed) = self.state.capture.stop() else {
            self.analyzer.reset();
            return Ok(StopOutcome::Disarmed);
        };

        if flushed.samples.is_empty() {
            self.analyzer.reset();
            info!(session_id = %flushed.session_id, "Nothing captured");
            return Ok(StopOutcome::NothingCaptured);
        }

        let snapshot = self.analyzer.waveform().snapshot();
        self.analyzer.reset();

        let encoded = encode_wav(&flushed.samples, flushed.sample_rate)?;
        let name = resolve_name(prompt, Local::now());

        Ok(StopOutcome::Saved(self.store.create(encoded, name, snapshot)))
    }

    /// Set input gain, clamped to `[0, 2.0]`; applies from the next block.
    pub fn set_gain(&mut self, gain: f32) -> f32 {
        let stored = self.state.gain.set(gain);
        debug!(gain = stored, "Gain changed");
        stored
    }

    /// Change the input used for the next arm.
    ///
    /// While Armed this cancels monitoring (returns `true`); while Capturing
    /// the current session keeps its device.
    #[instrument(skip(self))]
    pub fn select_device(&mut self, device: Option<String>) -> bool {
        self.state.selected_device = device;

        if self.state.is_armed() {
            let cancelled = self.cancel().is_ok();
            info!("Monitoring stopped after device change");
            return cancelled;
        }
        false
    }

    /// Route playback and metronome clicks to `output`.
    pub fn set_output(&mut self, output: Option<Arc<dyn SoundSink>>) {
        self.stop_playback();
        self.metronome.set_sink(output.clone());
        self.output = output;
    }

    /// Whether an output is attached.
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Metronome sharing this pipeline's output.
    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    /// Mutable metronome access.
    pub fn metronome_mut(&mut self) -> &mut Metronome {
        &mut self.metronome
    }

    /// Recording store.
    pub fn store(&self) -> &RecordingStore<S> {
        &self.store
    }

    /// Mutable recording store.
    pub fn store_mut(&mut self) -> &mut RecordingStore<S> {
        &mut self.store
    }

    /// Recordings in creation order.
    pub fn recordings(&self) -> &[Recording] {
        self.store.list()
    }

    /// Load durable recordings. Returns how many were restored.
    pub async fn restore(&mut self) -> usize {
        self.store.restore_all().await
    }

    /// Delete recording `id`, stopping its playback. `false` if unknown.
    pub fn delete(&mut self, id: u64) -> bool {
        self.store.delete(id)
    }

    /// Show and, with an output attached, play recording `id`.
    ///
    /// Decoding problems fall back to the stored snapshot and silent
    /// playback; they are logged, not returned.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn play(&mut self, id: u64) -> CoreResult<Playback> {
        let lease = self.store.lease(id)?;
        let recording = self.store.get(id)?;

        let waveform = playback_waveform_or_snapshot(
            lease.encoded().bytes(),
            &recording.waveform_snapshot,
            self.analyzer.scaling(),
        );

        self.stop_playback();
        let voice = self.output.clone().and_then(|sink| route(&lease, sink.as_ref()));
        self.playing = voice.clone();

        Ok(Playback {
            id,
            waveform,
            voice,
        })
    }

    /// Stop whatever recording is playing.
    pub fn stop_playback(&mut self) {
        if let Some(voice) = self.playing.take() {
            voice.stop();
        }
    }

    /// Write every recording plus a manifest into one archive in `dir`.
    ///
    /// # Errors
    ///
    /// `ExportFailure` when there are no recordings or writing fails.
    #[track_caller]
    pub fn export<W: ArchiveWriter>(&self, writer: &W, dir: &Path) -> CoreResult<PathBuf> {
        let bundle = ExportBundle::build(self.store.list(), Local::now())?;
        let path = dir.join(format!("{}.{}", bundle.archive_stem(), writer.extension()));
        writer.write_archive(&bundle, &path)?;
        Ok(path)
    }

    /// Write recording `id` to `dir` as `<name>.wav`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `ExportFailure` if the file cannot be
    /// written.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn download(&self, id: u64, dir: &Path) -> CoreResult<PathBuf> {
        let recording = self.store.get(id)?;
        let path = dir.join(recording.download_file_name());

        std::fs::write(&path, recording.encoded.bytes()).map_err(|e| {
            AudioError::ExportFailure {
                reason: format!("Failed to write {:?}: {}", path, e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        info!(id, file = ?path, "Recording downloaded");
        Ok(path)
    }

    /// Release the input, metronome and playback.
    pub fn shutdown(&mut self) {
        if self.state.capture.is_capturing() {
            warn!("Shutting down while capturing, unsaved audio is discarded");
        }
        let _ = self.state.capture.stop();
        self.release_input();
        self.metronome.stop();
        self.stop_playback();
    }

    fn release_input(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }
}

impl<I: InputOpener, S: DurableStore> Drop for Recorder<I, S> {
    fn drop(&mut self) {
        self.release_input();
    }
}

/// Decode, resample to the sink rate and queue. `None` when any step fails.
fn route(lease: &PlaybackLease, sink: &dyn SoundSink) -> Option<VoiceHandle> {
    let decoded = match decode_wav(lease.encoded().bytes()) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(id = lease.id(), error = %e, "Cannot decode recording for playback");
            return None;
        }
    };

    let samples = match Resampler::new(decoded.sample_rate, sink.sample_rate())
        .and_then(|mut r| r.convert(&decoded.samples))
    {
        Ok(samples) => samples,
        Err(e) => {
            warn!(id = lease.id(), error = %e, "Cannot resample recording for playback");
            return None;
        }
    };

    debug!(id = lease.id(), samples = samples.len(), "Playback queued");
    Some(sink.play(samples, Some(lease.revocation_flag())))
}
