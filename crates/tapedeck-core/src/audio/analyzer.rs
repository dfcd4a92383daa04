//! Level metering and live waveform sampling.
//!
//! Every block yields two independent readings: a waveform point derived from
//! the pre-gain samples, and a 0-100 meter percentage derived from the same
//! metrics multiplied by the input gain. The waveform therefore keeps one
//! visual scale regardless of gain, while the meter shows how hot the
//! recording will be.

use crate::audio::SampleBlock;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Rolling waveform length that triggers truncation.
pub const WAVEFORM_CEILING_LEN: usize = 500;

/// Length the rolling waveform is cut back to once it passes the ceiling.
pub const WAVEFORM_RETAIN_LEN: usize = 400;

/// Meter percentage above which the signal is treated as clipping.
pub const CLIPPING_THRESHOLD: f32 = 95.0;

/// Meter percentage above which the signal is treated as hot.
pub const HOT_THRESHOLD: f32 = 80.0;

/// Nonlinear scaling constants for waveform and meter.
///
/// Defaults keep low-amplitude speech visible; they are tuning values and can
/// be overridden from configuration. Missing fields deserialize to their
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterScaling {
    /// RMS multiplier for the combined waveform value.
    pub waveform_rms_scale: f32,
    /// Peak multiplier for the combined waveform value.
    pub waveform_peak_scale: f32,
    /// Upper clamp of a waveform point.
    pub waveform_ceiling: f32,
    /// Gain-adjusted RMS multiplier for the meter.
    pub meter_rms_scale: f32,
    /// Gain-adjusted peak multiplier for the meter.
    pub meter_peak_scale: f32,
    /// Gain-adjusted combined-value multiplier for the meter.
    pub meter_combined_scale: f32,
}

impl Default for MeterScaling {
    fn default() -> Self {
        Self {
            waveform_rms_scale: 10.0,
            waveform_peak_scale: 5.0,
            waveform_ceiling: 2.0,
            meter_rms_scale: 800.0,
            meter_peak_scale: 400.0,
            meter_combined_scale: 80.0,
        }
    }
}

impl MeterScaling {
    /// `max(rms * rms_scale, peak * peak_scale)`, unclamped.
    pub fn combine(&self, rms: f32, peak: f32) -> f32 {
        (rms * self.waveform_rms_scale).max(peak * self.waveform_peak_scale)
    }

    /// Combined value clamped to `[0, waveform_ceiling]`.
    pub fn waveform_point(&self, rms: f32, peak: f32) -> f32 {
        self.clamp_point(self.combine(rms, peak))
    }

    fn clamp_point(&self, combined: f32) -> f32 {
        // Not `f32::clamp`: an unnormalized ceiling must not panic.
        combined.min(self.waveform_ceiling).max(0.0)
    }

    /// Reset every non-finite or non-positive constant to its default.
    ///
    /// Returns `true` when anything was replaced.
    pub fn normalize(&mut self) -> bool {
        let defaults = Self::default();
        let mut changed = false;

        for (name, value, default) in [
            ("waveform_rms_scale", &mut self.waveform_rms_scale, defaults.waveform_rms_scale),
            ("waveform_peak_scale", &mut self.waveform_peak_scale, defaults.waveform_peak_scale),
            ("waveform_ceiling", &mut self.waveform_ceiling, defaults.waveform_ceiling),
            ("meter_rms_scale", &mut self.meter_rms_scale, defaults.meter_rms_scale),
            ("meter_peak_scale", &mut self.meter_peak_scale, defaults.meter_peak_scale),
            ("meter_combined_scale", &mut self.meter_combined_scale, defaults.meter_combined_scale),
        ] {
            if !value.is_finite() || *value <= 0.0 {
                warn!(field = name, configured = *value, default, "Meter scaling invalid, using default");
                *value = default;
                changed = true;
            }
        }

        changed
    }
}

/// Meter colour band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeterZone {
    /// Comfortable level.
    Normal,
    /// Approaching clipping.
    Hot,
    /// Clipping.
    Clipping,
}

impl MeterZone {
    /// Classify a 0-100 meter level.
    pub fn from_level(level: f32) -> Self {
        if level > CLIPPING_THRESHOLD {
            MeterZone::Clipping
        } else if level > HOT_THRESHOLD {
            MeterZone::Hot
        } else {
            MeterZone::Normal
        }
    }
}

/// Metrics derived from one block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelReading {
    /// Root-mean-square of the pre-gain samples.
    pub rms: f32,
    /// Largest absolute pre-gain sample.
    pub peak: f32,
    /// Unclamped `max(rms * 10, peak * 5)`.
    pub combined: f32,
    /// Combined value clamped to `[0, 2.0]`.
    pub waveform_sample: f32,
    /// Gain-adjusted meter percentage, `[0, 100]`.
    pub meter_level: f32,
    /// Band of `meter_level`.
    pub zone: MeterZone,
}

/// RMS and peak of a sample slice. Empty input yields zeros.
pub fn rms_and_peak(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }

    let (sum_squares, peak) = samples.iter().fold((0.0f64, 0.0f32), |(sum, peak), &s| {
        (sum + f64::from(s) * f64::from(s), peak.max(s.abs()))
    });

    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;
    (rms, peak)
}

/// Compute a [`LevelReading`] for `block` without touching any state.
pub fn analyze(block: &SampleBlock, scaling: &MeterScaling) -> LevelReading {
    // Waveform path: pre-gain metrics.
    let (rms, peak) = rms_and_peak(block.raw());
    let combined = scaling.combine(rms, peak);
    let waveform_sample = scaling.clamp_point(combined);

    // Meter path: the same metrics scaled by the gain in effect for the block.
    let gain = block.gain();
    let adjusted_rms = rms * gain;
    let adjusted_peak = peak * gain;
    let adjusted_combined = combined * gain;

    let meter_level = (adjusted_rms * scaling.meter_rms_scale)
        .max(adjusted_peak * scaling.meter_peak_scale)
        .max(adjusted_combined * scaling.meter_combined_scale)
        .min(100.0);

    LevelReading {
        rms,
        peak,
        combined,
        waveform_sample,
        meter_level,
        zone: MeterZone::from_level(meter_level),
    }
}

/// Recent waveform points for the live display.
///
/// Once more than [`WAVEFORM_CEILING_LEN`] points are held, the sequence is
/// cut back to the newest [`WAVEFORM_RETAIN_LEN`], so truncation happens once
/// per hundred blocks rather than on every block.
#[derive(Debug, Clone, Default)]
pub struct RollingWaveform {
    points: Vec<f32>,
}

impl RollingWaveform {
    /// Empty waveform.
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(WAVEFORM_CEILING_LEN + 1),
        }
    }

    /// Append one point, truncating past the ceiling.
    pub fn push(&mut self, point: f32) {
        self.points.push(point);

        if self.points.len() > WAVEFORM_CEILING_LEN {
            let excess = self.points.len() - WAVEFORM_RETAIN_LEN;
            self.points.drain(..excess);
        }
    }

    /// Current points, oldest first.
    pub fn points(&self) -> &[f32] {
        &self.points
    }

    /// Owned copy of the current points.
    pub fn snapshot(&self) -> Vec<f32> {
        self.points.clone()
    }

    /// Number of points held.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points are held.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Stateful analyzer: computes readings and feeds the rolling waveform.
#[derive(Debug, Clone, Default)]
pub struct LevelAnalyzer {
    scaling: MeterScaling,
    waveform: RollingWaveform,
    last: Option<LevelReading>,
}

impl LevelAnalyzer {
    /// Analyzer with the given scaling constants, normalized.
    pub fn new(mut scaling: MeterScaling) -> Self {
        scaling.normalize();
        Self {
            scaling,
            waveform: RollingWaveform::new(),
            last: None,
        }
    }

    /// Analyze one block and append its waveform point.
    pub fn process(&mut self, block: &SampleBlock) -> LevelReading {
        let reading = analyze(block, &self.scaling);
        self.waveform.push(reading.waveform_sample);
        self.last = Some(reading);

        trace!(
            sequence = block.sequence(),
            rms = reading.rms,
            peak = reading.peak,
            meter_level = reading.meter_level,
            "Block analyzed"
        );

        reading
    }

    /// Most recent reading, if any block has been processed since reset.
    pub fn last_reading(&self) -> Option<LevelReading> {
        self.last
    }

    /// Live waveform.
    pub fn waveform(&self) -> &RollingWaveform {
        &self.waveform
    }

    /// Scaling constants in use.
    pub fn scaling(&self) -> &MeterScaling {
        &self.scaling
    }

    /// Forget the waveform and last reading.
    pub fn reset(&mut self) {
        self.waveform.clear();
        self.last = None;
    }
}
