use crate::{
    CoreResult,
    audio::{MeterScaling, rms_and_peak},
    codec::decode_wav,
};

use tracing::{debug, instrument, warn};

/// Points in a playback waveform.
pub const PLAYBACK_WAVEFORM_POINTS: usize = 700;

/// Where a playback waveform came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackWaveform {
    /// Computed from the decoded container.
    Decoded(Vec<f32>),
    /// The container could not be decoded; the capture-time snapshot is used.
    Snapshot(Vec<f32>),
}

impl PlaybackWaveform {
    /// Points regardless of origin.
    pub fn points(&self) -> &[f32] {
        match self {
            PlaybackWaveform::Decoded(points) | PlaybackWaveform::Snapshot(points) => points,
        }
    }

    /// Whether the snapshot fallback was used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, PlaybackWaveform::Snapshot(_))
    }
}

/// Decimate `samples` into [`PLAYBACK_WAVEFORM_POINTS`] points using the live
/// combine-and-clamp formula, so played-back and live waveforms match.
///
/// Each point covers `floor(len / 700)` samples (at least one); points past
/// the end of short input read as silence.
pub fn decimate(samples: &[f32], scaling: &MeterScaling) -> Vec<f32> {
    let block_size = (samples.len() / PLAYBACK_WAVEFORM_POINTS).max(1);

    (0..PLAYBACK_WAVEFORM_POINTS)
        .map(|i| {
            let start = (i * block_size).min(samples.len());
            let end = (start + block_size).min(samples.len());
            let (rms, peak) = rms_and_peak(&samples[start..end]);
            scaling.waveform_point(rms, peak)
        })
        .collect()
}

/// Decode `bytes` and decimate them.
///
/// # Errors
///
/// `EncodingFailure` if the bytes are not a readable container.
pub fn playback_waveform(bytes: &[u8], scaling: &MeterScaling) -> CoreResult<Vec<f32>> {
    let decoded = decode_wav(bytes)?;
    Ok(decimate(&decoded.samples, scaling))
}

/// [`playback_waveform`], falling back to `snapshot` when decoding fails.
#[instrument(skip(bytes, snapshot, scaling), fields(size_bytes = bytes.len()))]
pub fn playback_waveform_or_snapshot(
    bytes: &[u8],
    snapshot: &[f32],
    scaling: &MeterScaling,
) -> PlaybackWaveform {
    match playback_waveform(bytes, scaling) {
        Ok(points) => {
            debug!(points = points.len(), "Playback waveform decoded");
            PlaybackWaveform::Decoded(points)
        }
        Err(e) => {
            warn!(error = %e, "Playback waveform decode failed, using stored snapshot");
            PlaybackWaveform::Snapshot(snapshot.to_vec())
        }
    }
}
