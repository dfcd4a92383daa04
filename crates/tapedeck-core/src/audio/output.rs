use crate::{AudioError, CoreResult};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use cpal::{
    BuildStreamError, Device, SampleFormat, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Control over one sound queued on a [`SoundSink`].
#[derive(Debug, Clone, Default)]
pub struct VoiceHandle {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl VoiceHandle {
    /// Stop the sound at the next callback.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether the sound has played out or been stopped.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Somewhere mono sounds can be played.
pub trait SoundSink: Send + Sync {
    /// Rate `samples` passed to [`SoundSink::play`] must be at.
    fn sample_rate(&self) -> u32;

    /// Queue `samples` for playback, mixed with whatever else is playing.
    ///
    /// The sound is dropped as soon as `revoked` (if given) turns true.
    fn play(&self, samples: Vec<f32>, revoked: Option<Arc<AtomicBool>>) -> VoiceHandle;

    /// Silence everything queued.
    fn stop_all(&self);
}

struct Voice {
    samples: Vec<f32>,
    position: usize,
    revoked: Option<Arc<AtomicBool>>,
    handle: VoiceHandle,
}

impl Voice {
    fn cancelled(&self) -> bool {
        self.handle.stop.load(Ordering::Acquire)
            || self
                .revoked
                .as_ref()
                .is_some_and(|r| r.load(Ordering::Acquire))
    }
}

/// Sums queued mono voices into interleaved output frames.
#[derive(Default)]
pub(crate) struct OutputMixer {
    voices: Vec<Voice>,
}

impl OutputMixer {
    pub(crate) fn add(&mut self, samples: Vec<f32>, revoked: Option<Arc<AtomicBool>>) -> VoiceHandle {
        let handle = VoiceHandle::default();
        self.voices.push(Voice {
            samples,
            position: 0,
            revoked,
            handle: handle.clone(),
        });
        handle
    }

    pub(crate) fn active(&self) -> usize {
        self.voices.len()
    }

    pub(crate) fn clear(&mut self) {
        for voice in self.voices.drain(..) {
            voice.handle.finished.store(true, Ordering::Release);
        }
    }

    /// Fill `out` (interleaved, `channels` wide), writing the same mono mix
    /// to every channel.
    pub(crate) fn fill(&mut self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        let channels = channels.max(1);
        let frames = out.len() / channels;

        for voice in &mut self.voices {
            if voice.cancelled() {
                voice.position = voice.samples.len();
                continue;
            }
            let remaining = &voice.samples[voice.position..];
            let count = remaining.len().min(frames);
            for (frame, sample) in out.chunks_mut(channels).zip(&remaining[..count]) {
                for slot in frame {
                    *slot += sample;
                }
            }
            voice.position += count;
        }

        for slot in out.iter_mut() {
            *slot = slot.clamp(-1.0, 1.0);
        }

        self.voices.retain(|voice| {
            let done = voice.position >= voice.samples.len();
            if done {
                voice.handle.finished.store(true, Ordering::Release);
            }
            !done
        });
    }
}

/// Cheap, shareable handle onto an open [`AudioOutput`].
#[derive(Clone)]
pub struct OutputHandle {
    mixer: Arc<Mutex<OutputMixer>>,
    sample_rate: u32,
}

impl OutputHandle {
    fn lock(&self) -> MutexGuard<'_, OutputMixer> {
        lock_mixer(&self.mixer)
    }

    /// Number of sounds still playing.
    pub fn active_voices(&self) -> usize {
        self.lock().active()
    }
}

impl SoundSink for OutputHandle {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn play(&self, samples: Vec<f32>, revoked: Option<Arc<AtomicBool>>) -> VoiceHandle {
        self.lock().add(samples, revoked)
    }

    fn stop_all(&self) {
        self.lock().clear();
    }
}

fn lock_mixer(mixer: &Mutex<OutputMixer>) -> MutexGuard<'_, OutputMixer> {
    mixer.lock().unwrap_or_else(|e| {
        error!("Output mixer lock poisoned, recovering: {}", e);
        e.into_inner()
    })
}

/// Open output device stream.
///
/// Owns the cpal stream; hand [`AudioOutput::handle`] to whoever needs to
/// play sounds.
pub struct AudioOutput {
    device_name: String,
    stream: Option<Stream>,
    handle: OutputHandle,
    shutdown: Arc<AtomicBool>,
}

impl AudioOutput {
    /// Open the output named `device_id`, or the default output when `None`.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` when no matching output exists, `DeviceError` when
    /// the stream cannot be built or started.
    #[track_caller]
    #[instrument]
    pub fn open(device_id: Option<&str>) -> CoreResult<Self> {
        let host = cpal::default_host();
        let device = find_output_device(&host, device_id)?;
        let device_name = device_label(&device);
        let config = output_config(&device)?;
        let channels = usize::from(config.channels);

        let mixer = Arc::new(Mutex::new(OutputMixer::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let callback_mixer = Arc::clone(&mixer);
        let callback_shutdown = Arc::clone(&shutdown);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if callback_shutdown.load(Ordering::Acquire) {
                        data.fill(0.0);
                        return;
                    }
                    lock_mixer(&callback_mixer).fill(data, channels);
                },
                |err| {
                    error!("Audio output stream error: {}", err);
                },
                None,
            )
            .map_err(|e| match e {
                BuildStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable {
                    reason: format!("Output not available: {}", device_name),
                    location: ErrorLocation::from(Location::caller()),
                },
                other => AudioError::DeviceError {
                    reason: format!("Failed to build output stream: {}", other),
                    location: ErrorLocation::from(Location::caller()),
                },
            })?;

        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start output stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device = %device_name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Audio output opened"
        );

        Ok(Self {
            device_name,
            stream: Some(stream),
            handle: OutputHandle {
                mixer,
                sample_rate: config.sample_rate,
            },
            shutdown,
        })
    }

    /// Shareable handle for queuing sounds.
    pub fn handle(&self) -> OutputHandle {
        self.handle.clone()
    }

    /// Name of the opened device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Stop the stream and drop anything queued. Safe to call twice.
    #[instrument(skip(self), fields(device = %self.device_name))]
    pub fn close(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.handle.stop_all();

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "Pause before close failed");
            }
            drop(stream);
            info!("Audio output closed");
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[allow(deprecated)]
fn device_label(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "unknown device".to_string())
}

#[track_caller]
fn find_output_device(host: &cpal::Host, device_id: Option<&str>) -> CoreResult<Device> {
    match device_id {
        None => host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceUnavailable {
                reason: "No default output device".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        Some(wanted) => host
            .output_devices()
            .map_err(|e| AudioError::DeviceUnavailable {
                reason: format!("Failed to list output devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?
            .find(|d| device_label(d) == wanted)
            .ok_or_else(|| AudioError::DeviceUnavailable {
                reason: format!("No output device named {:?}", wanted),
                location: ErrorLocation::from(Location::caller()),
            }),
    }
}

#[track_caller]
fn output_config(device: &Device) -> CoreResult<StreamConfig> {
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceUnavailable {
            reason: format!("Failed to get output config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    if config.sample_format() != SampleFormat::F32 {
        warn!(format = ?config.sample_format(), "Output default is not f32, requesting f32 anyway");
    }

    Ok(config.into())
}

/// Names of the output devices on the default host.
///
/// # Errors
///
/// `DeviceUnavailable` if the host cannot enumerate outputs.
#[track_caller]
pub fn output_device_names() -> CoreResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceUnavailable {
            reason: format!("Failed to list output devices: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(devices.map(|d| device_label(&d)).collect())
}
