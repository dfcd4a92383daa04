use crate::{AudioError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as _};
use tracing::{debug, instrument};

const CHUNK_FRAMES: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter used to play recordings on devices that do
/// not run at the recording rate.
///
/// Equal rates pass samples through untouched.
pub struct Resampler {
    fft: Option<Fft<f32>>,
    from_rate: u32,
    to_rate: u32,
}

#[track_caller]
fn resampling_error(reason: String) -> AudioError {
    AudioError::ResamplingError {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}

impl Resampler {
    /// Converter from `from_rate` to `to_rate`.
    ///
    /// # Errors
    ///
    /// `ResamplingError` for a zero rate or when rubato rejects the ratio.
    #[track_caller]
    #[instrument]
    pub fn new(from_rate: u32, to_rate: u32) -> CoreResult<Self> {
        if from_rate == 0 || to_rate == 0 {
            return Err(resampling_error(format!(
                "Invalid rates {} -> {}",
                from_rate, to_rate
            )));
        }

        let fft = if from_rate == to_rate {
            None
        } else {
            Some(
                Fft::<f32>::new(
                    from_rate as usize,
                    to_rate as usize,
                    CHUNK_FRAMES,
                    SUB_CHUNKS,
                    1,
                    FixedSync::Input,
                )
                .map_err(|e| resampling_error(format!("Failed to create resampler: {}", e)))?,
            )
        };

        debug!(from_rate, to_rate, passthrough = fft.is_none(), "Resampler ready");

        Ok(Self {
            fft,
            from_rate,
            to_rate,
        })
    }

    /// Whether samples pass through unchanged.
    pub fn is_passthrough(&self) -> bool {
        self.fft.is_none()
    }

    /// Number of output samples `input_len` input samples map to.
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len as u64 * u64::from(self.to_rate) / u64::from(self.from_rate)) as usize
    }

    /// Convert a whole clip. The final partial chunk is zero-padded and the
    /// result trimmed to [`Resampler::output_len`].
    ///
    /// # Errors
    ///
    /// `ResamplingError` if rubato fails on a chunk.
    #[track_caller]
    #[instrument(skip(self, samples), fields(input_len = samples.len()))]
    pub fn convert(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        let wanted = self.output_len(samples.len());

        let Some(fft) = self.fft.as_mut() else {
            return Ok(samples.to_vec());
        };
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let delay = fft.output_delay();
        let max_out = fft.output_frames_max();
        let mut scratch_in = vec![0.0f32; CHUNK_FRAMES];
        let mut scratch_out = vec![0.0f32; max_out];
        let mut output = Vec::with_capacity(wanted + delay + max_out);

        for chunk in samples.chunks(CHUNK_FRAMES) {
            scratch_in[..chunk.len()].copy_from_slice(chunk);
            scratch_in[chunk.len()..].fill(0.0);

            let input = InterleavedSlice::new(&scratch_in, 1, CHUNK_FRAMES)
                .map_err(|e| resampling_error(format!("Bad input buffer: {}", e)))?;
            let mut out = InterleavedSlice::new_mut(&mut scratch_out, 1, max_out)
                .map_err(|e| resampling_error(format!("Bad output buffer: {}", e)))?;

            let (_, written) = fft
                .process_into_buffer(&input, &mut out, None)
                .map_err(|e| resampling_error(format!("Resampling failed: {}", e)))?;

            output.extend_from_slice(&scratch_out[..written]);
        }

        // The FFT stage delays its output; keep flushing silence until the
        // tail of the clip has come out.
        while output.len() < wanted + delay {
            scratch_in.fill(0.0);
            let input = InterleavedSlice::new(&scratch_in, 1, CHUNK_FRAMES)
                .map_err(|e| resampling_error(format!("Bad input buffer: {}", e)))?;
            let mut out = InterleavedSlice::new_mut(&mut scratch_out, 1, max_out)
                .map_err(|e| resampling_error(format!("Bad output buffer: {}", e)))?;
            let (_, written) = fft
                .process_into_buffer(&input, &mut out, None)
                .map_err(|e| resampling_error(format!("Resampling failed: {}", e)))?;
            if written == 0 {
                break;
            }
            output.extend_from_slice(&scratch_out[..written]);
        }

        output.drain(..delay.min(output.len()));
        output.truncate(wanted);
        fft.reset();

        debug!(output_len = output.len(), "Clip resampled");

        Ok(output)
    }
}
