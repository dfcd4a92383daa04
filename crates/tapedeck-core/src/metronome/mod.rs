//! Click track played while monitoring or recording.
//!
//! A [`Metronome`] owns at most one timer task. Every settings change while
//! running aborts that task and spawns a fresh one, so there is never more
//! than one tick source.

mod click;

pub use click::{CLICK_SECONDS, ClickVoice, synth_click};

use crate::audio::SoundSink;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, instrument, trace};

/// Slowest tempo.
pub const MIN_BPM: u32 = 40;
/// Fastest tempo.
pub const MAX_BPM: u32 = 200;
/// Fewest beats in a bar.
pub const MIN_BEATS_PER_BAR: u32 = 1;
/// Most beats in a bar.
pub const MAX_BEATS_PER_BAR: u32 = 19;

/// Note value that gets one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteUnit {
    /// Half notes.
    Half,
    /// Quarter notes.
    Quarter,
    /// Eighth notes.
    Eighth,
}

impl NoteUnit {
    /// Denominator of the time signature.
    pub fn denominator(self) -> u8 {
        match self {
            NoteUnit::Half => 2,
            NoteUnit::Quarter => 4,
            NoteUnit::Eighth => 8,
        }
    }
}

impl TryFrom<u8> for NoteUnit {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(NoteUnit::Half),
            4 => Ok(NoteUnit::Quarter),
            8 => Ok(NoteUnit::Eighth),
            other => Err(format!("note unit must be 2, 4 or 8, got {}", other)),
        }
    }
}

impl From<NoteUnit> for u8 {
    fn from(unit: NoteUnit) -> Self {
        unit.denominator()
    }
}

/// Tempo and time signature, always within range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetronomeSettings {
    bpm: u32,
    beats_per_bar: u32,
    note_unit: NoteUnit,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self::new(120, 4, NoteUnit::Quarter)
    }
}

impl MetronomeSettings {
    /// Settings with `bpm` and `beats_per_bar` clamped into range.
    pub fn new(bpm: u32, beats_per_bar: u32, note_unit: NoteUnit) -> Self {
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            beats_per_bar: beats_per_bar.clamp(MIN_BEATS_PER_BAR, MAX_BEATS_PER_BAR),
            note_unit,
        }
    }

    /// Beats per minute.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Beats in one bar.
    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    /// Clicked note value.
    pub fn note_unit(&self) -> NoteUnit {
        self.note_unit
    }

    /// Time between clicks: `60 / bpm * 4 / note_unit` seconds.
    pub fn interval(&self) -> Duration {
        let quarter = 60.0 / f64::from(self.bpm);
        Duration::from_secs_f64(quarter * 4.0 / f64::from(self.note_unit.denominator()))
    }
}

impl fmt::Display for MetronomeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} BPM, {}/{}",
            self.bpm,
            self.beats_per_bar,
            self.note_unit.denominator()
        )
    }
}

/// Beat after `beat` in a bar of `beats_per_bar`; wraps to 1.
pub fn next_beat(beat: u32, beats_per_bar: u32) -> u32 {
    if beat >= beats_per_bar { 1 } else { beat + 1 }
}

/// Tokio-driven click track.
pub struct Metronome {
    settings: MetronomeSettings,
    sink: Option<Arc<dyn SoundSink>>,
    timer: Option<JoinHandle<()>>,
    /// Beat that sounded last, 0 when stopped.
    beat: Arc<AtomicU32>,
}

impl Metronome {
    /// Stopped metronome with `settings` and no sink.
    pub fn new(settings: MetronomeSettings) -> Self {
        Self {
            settings,
            sink: None,
            timer: None,
            beat: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Current settings.
    pub fn settings(&self) -> MetronomeSettings {
        self.settings
    }

    /// Whether a timer is scheduled.
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Beat that sounded last, 0 when stopped.
    pub fn current_beat(&self) -> u32 {
        self.beat.load(Ordering::Acquire)
    }

    /// Route clicks to `sink`. Without one the metronome still counts beats.
    pub fn set_sink(&mut self, sink: Option<Arc<dyn SoundSink>>) {
        self.sink = sink;
        self.reschedule();
    }

    /// Start clicking, first click immediately. No-op when already running.
    ///
    /// Must be called within a Tokio runtime.
    #[instrument(skip(self), fields(settings = %self.settings))]
    pub fn start(&mut self) {
        if self.timer.is_some() {
            return;
        }
        self.spawn_timer();
        info!("Metronome started");
    }

    /// Stop clicking. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            self.beat.store(0, Ordering::Release);
            info!("Metronome stopped");
        }
    }

    /// Set the tempo, clamped to 40-200. Returns the stored value.
    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        self.update(MetronomeSettings::new(
            bpm,
            self.settings.beats_per_bar,
            self.settings.note_unit,
        ));
        self.settings.bpm
    }

    /// Set the bar length, clamped to 1-19. Returns the stored value.
    pub fn set_beats_per_bar(&mut self, beats: u32) -> u32 {
        self.update(MetronomeSettings::new(
            self.settings.bpm,
            beats,
            self.settings.note_unit,
        ));
        self.settings.beats_per_bar
    }

    /// Set the clicked note value.
    pub fn set_note_unit(&mut self, note_unit: NoteUnit) {
        self.update(MetronomeSettings::new(
            self.settings.bpm,
            self.settings.beats_per_bar,
            note_unit,
        ));
    }

    fn update(&mut self, settings: MetronomeSettings) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        debug!(settings = %settings, "Metronome settings changed");
        self.reschedule();
    }

    fn reschedule(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            self.spawn_timer();
        }
    }

    fn spawn_timer(&mut self) {
        let settings = self.settings;
        let sink = self.sink.clone();
        let beat = Arc::clone(&self.beat);

        let clicks = sink.as_ref().map(|s| {
            let rate = s.sample_rate();
            (
                synth_click(ClickVoice::ACCENT, rate),
                synth_click(ClickVoice::NORMAL, rate),
            )
        });

        beat.store(0, Ordering::Release);

        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval(settings.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut current = 1;

            loop {
                ticker.tick().await;

                let accent = current == 1;
                beat.store(current, Ordering::Release);
                trace!(beat = current, accent, "Click");

                if let (Some(sink), Some((accent_click, normal_click))) = (&sink, &clicks) {
                    let samples = if accent { accent_click } else { normal_click };
                    let _voice = sink.play(samples.clone(), None);
                }

                current = next_beat(current, settings.beats_per_bar);
            }
        }));
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
