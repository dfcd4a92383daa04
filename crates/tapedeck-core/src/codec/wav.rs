//! RIFF/WAVE container: mono 16-bit PCM encoding and generic decoding.

use crate::{AudioError, CoreResult};

use std::{io::Cursor, panic::Location, sync::Arc};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::{debug, instrument};

/// MIME type reported for encoded recordings.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the canonical PCM header.
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;

/// A complete, playable container. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl EncodedAudio {
    /// Wrap already-encoded bytes, e.g. when rehydrating from storage.
    pub fn from_parts(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Container bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the container bytes.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// MIME type of the container.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Container length in bytes.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Quantize one sample: `round(clamp(s, -1, 1) * 32767)`. NaN maps to 0.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

/// Encode mono samples as a 44-byte-header PCM WAV.
///
/// # Errors
///
/// `EncodingFailure` if the data chunk would not fit the 32-bit RIFF size
/// fields or the writer fails.
#[track_caller]
#[instrument(skip(samples), fields(sample_count = samples.len()))]
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> CoreResult<EncodedAudio> {
    let data_len = samples
        .len()
        .checked_mul(usize::from(BYTES_PER_SAMPLE))
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| n.checked_add(36).is_some())
        .ok_or_else(|| AudioError::EncodingFailure {
            reason: format!("{} samples exceed the WAV size limit", samples.len()),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    let mut writer =
        WavWriter::new(Cursor::new(&mut out), spec).map_err(|e| AudioError::EncodingFailure {
            reason: format!("Failed to write WAV header: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    for &sample in samples {
        writer
            .write_sample(quantize(sample))
            .map_err(|e| AudioError::EncodingFailure {
                reason: format!("Failed to write sample: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
    }

    writer.finalize().map_err(|e| AudioError::EncodingFailure {
        reason: format!("Failed to finalize WAV: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    debug!(size_bytes = out.len(), sample_rate, "Encoded WAV");

    Ok(EncodedAudio::from_parts(out, WAV_MIME_TYPE))
}

/// First-channel samples decoded from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Sample rate from the header.
    pub sample_rate: u32,
    /// Channel count from the header.
    pub channels: u16,
    /// First channel, normalized to `[-1, 1]`.
    pub samples: Vec<f32>,
}

/// Decode any PCM or float WAV, keeping the first channel.
///
/// # Errors
///
/// `EncodingFailure` for malformed or unsupported input.
#[track_caller]
#[instrument(skip(bytes), fields(size_bytes = bytes.len()))]
pub fn decode_wav(bytes: &[u8]) -> CoreResult<DecodedAudio> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::EncodingFailure {
        reason: format!("Failed to read WAV header: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::EncodingFailure {
                reason: format!("Failed to read float samples: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::EncodingFailure {
                    reason: format!("Failed to read PCM samples: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?
        }
    };

    let samples = interleaved.into_iter().step_by(channels).collect();

    Ok(DecodedAudio {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}
