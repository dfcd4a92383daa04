use crate::{
    AudioError, CoreResult,
    audio::{BLOCK_SIZE, SAMPLE_RATE, SampleBlock, clamp_gain},
};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use cpal::{
    BuildStreamError, Device, SampleFormat, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Blocks buffered between the audio callback and the tick loop.
///
/// At 4096 samples per block and 44.1 kHz this is roughly six seconds, far
/// longer than any tick gap; overflow means the consumer has stopped.
pub(crate) const BLOCK_QUEUE_DEPTH: usize = 64;

/// Shared, lock-free input gain.
///
/// Stored as `f32` bits so the audio callback can read it without locking.
/// A new value is picked up by the next block assembled.
#[derive(Debug, Clone)]
pub struct GainControl {
    bits: Arc<AtomicU32>,
}

impl Default for GainControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl GainControl {
    /// Gain starting at `gain`, clamped to `[0, 2.0]`.
    pub fn new(gain: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(clamp_gain(gain).to_bits())),
        }
    }

    /// Current multiplier.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replace the multiplier, clamped to `[0, 2.0]`. Returns the stored value.
    pub fn set(&self, gain: f32) -> f32 {
        let gain = clamp_gain(gain);
        self.bits.store(gain.to_bits(), Ordering::Release);
        gain
    }
}

/// Turns interleaved device callbacks into fixed-size mono blocks.
///
/// Multi-channel input is averaged down to mono. Complete blocks are handed
/// to the consumer with `try_send`; the audio thread never waits.
pub(crate) struct BlockAssembler {
    channels: usize,
    pending: Vec<f32>,
    sequence: u64,
    gain: GainControl,
    tx: mpsc::Sender<SampleBlock>,
    dropped: u64,
}

impl BlockAssembler {
    pub(crate) fn new(channels: u16, gain: GainControl, tx: mpsc::Sender<SampleBlock>) -> Self {
        Self {
            channels: usize::from(channels.max(1)),
            pending: Vec::with_capacity(BLOCK_SIZE),
            sequence: 0,
            gain,
            tx,
            dropped: 0,
        }
    }

    pub(crate) fn push_interleaved(&mut self, data: &[f32]) {
        for frame in data.chunks(self.channels) {
            let mono = if frame.len() == 1 {
                frame[0]
            } else {
                frame.iter().sum::<f32>() / frame.len() as f32
            };

            self.pending.push(mono);

            if self.pending.len() == BLOCK_SIZE {
                self.emit();
            }
        }
    }

    fn emit(&mut self) {
        let raw = std::mem::replace(&mut self.pending, Vec::with_capacity(BLOCK_SIZE));
        let block = SampleBlock::new(self.sequence, raw, self.gain.get());
        self.sequence += 1;

        if let Err(e) = self.tx.try_send(block) {
            self.dropped += 1;
            if matches!(e, mpsc::error::TrySendError::Full(_)) {
                warn!(dropped = self.dropped, "Block queue full, dropping block");
            }
        }
    }
}

/// Live microphone input delivering [`SampleBlock`]s.
///
/// The stream callback runs on the audio thread and only assembles blocks;
/// all analysis happens on whoever drains [`SampleSource::drain`].
pub struct SampleSource {
    device_name: String,
    sample_rate: u32,
    stream: Option<Stream>,
    blocks: mpsc::Receiver<SampleBlock>,
    /// Set before the stream is dropped so a late callback does not emit.
    shutdown: Arc<AtomicBool>,
}

impl SampleSource {
    /// Open the input named `device_id`, or the default input when `None`.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` when no matching input exists or access is
    /// refused; `DeviceError` when the stream cannot be built or started.
    /// Nothing is left open on failure.
    #[track_caller]
    #[instrument(skip(gain))]
    pub fn open(device_id: Option<&str>, gain: GainControl) -> CoreResult<Self> {
        let host = cpal::default_host();
        let device = find_input_device(&host, device_id)?;
        let device_name = device_label(&device);
        let config = choose_config(&device)?;

        let (tx, rx) = mpsc::channel(BLOCK_QUEUE_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));
        let callback_shutdown = Arc::clone(&shutdown);
        let mut assembler = BlockAssembler::new(config.channels, gain, tx);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if callback_shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    assembler.push_interleaved(data);
                },
                |err| {
                    error!("Audio input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| match e {
                BuildStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable {
                    reason: format!("Device not available: {}", device_name),
                    location: ErrorLocation::from(Location::caller()),
                },
                other => AudioError::DeviceError {
                    reason: format!("Failed to build stream: {}", other),
                    location: ErrorLocation::from(Location::caller()),
                },
            })?;

        // On failure `stream` is dropped here, releasing the device.
        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device = %device_name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Audio input opened"
        );

        Ok(Self {
            device_name,
            sample_rate: config.sample_rate,
            stream: Some(stream),
            blocks: rx,
            shutdown,
        })
    }

    /// All blocks delivered since the last drain, in arrival order.
    pub fn drain(&mut self) -> Vec<SampleBlock> {
        let mut out = Vec::new();
        while let Ok(block) = self.blocks.try_recv() {
            out.push(block);
        }
        out
    }

    /// Rate the device is actually running at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Name of the opened device.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Whether the stream is still open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the stream. Safe to call more than once.
    #[instrument(skip(self), fields(device = %self.device_name))]
    pub fn close(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!(error = %e, "Pause before close failed");
            }
            drop(stream);
            info!("Audio input closed");
        }

        self.blocks.close();
    }
}

impl Drop for SampleSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[allow(deprecated)]
fn device_label(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "unknown device".to_string())
}

#[track_caller]
fn find_input_device(host: &cpal::Host, device_id: Option<&str>) -> CoreResult<Device> {
    match device_id {
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable {
                reason: "No default input device".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        Some(wanted) => {
            let devices = host
                .input_devices()
                .map_err(|e| AudioError::DeviceUnavailable {
                    reason: format!("Failed to list input devices: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            devices
                .into_iter()
                .find(|d| device_label(d) == wanted)
                .ok_or_else(|| AudioError::DeviceUnavailable {
                    reason: format!("No input device named {:?}", wanted),
                    location: ErrorLocation::from(Location::caller()),
                })
        }
    }
}

/// Prefer an f32 config that runs at [`SAMPLE_RATE`], mono if offered.
/// Falls back to the device default.
#[track_caller]
fn choose_config(device: &Device) -> CoreResult<StreamConfig> {
    let preferred = device.supported_input_configs().ok().and_then(|ranges| {
        ranges
            .filter(|r| r.sample_format() == SampleFormat::F32)
            .filter(|r| r.min_sample_rate() <= SAMPLE_RATE && SAMPLE_RATE <= r.max_sample_rate())
            .min_by_key(|r| r.channels())
    });

    if let Some(range) = preferred {
        return Ok(range.with_sample_rate(SAMPLE_RATE).config());
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable {
            reason: format!("Failed to get input config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    warn!(
        sample_rate = fallback.sample_rate(),
        format = ?fallback.sample_format(),
        "No f32 config at 44.1 kHz, using device default"
    );

    Ok(fallback.into())
}

/// A running input that delivers [`SampleBlock`]s.
pub trait BlockSource {
    /// All blocks delivered since the last drain, in arrival order.
    fn drain(&mut self) -> Vec<SampleBlock>;

    /// Rate the input runs at.
    fn sample_rate(&self) -> u32;

    /// Name of the input.
    fn device_name(&self) -> &str;

    /// Release the input. Must be idempotent.
    fn close(&mut self);
}

/// Opens inputs by device name.
pub trait InputOpener {
    /// Source type produced.
    type Source: BlockSource;

    /// Open `device_id` (default input when `None`) applying `gain`.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` or `DeviceError`, see [`SampleSource::open`].
    fn open(&self, device_id: Option<&str>, gain: GainControl) -> CoreResult<Self::Source>;
}

impl BlockSource for SampleSource {
    fn drain(&mut self) -> Vec<SampleBlock> {
        SampleSource::drain(self)
    }

    fn sample_rate(&self) -> u32 {
        SampleSource::sample_rate(self)
    }

    fn device_name(&self) -> &str {
        SampleSource::device_name(self)
    }

    fn close(&mut self) {
        SampleSource::close(self);
    }
}

/// Opens real inputs on the default cpal host.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalInput;

impl InputOpener for CpalInput {
    type Source = SampleSource;

    fn open(&self, device_id: Option<&str>, gain: GainControl) -> CoreResult<SampleSource> {
        SampleSource::open(device_id, gain)
    }
}

/// Names of the input devices on the default host.
///
/// # Errors
///
/// `DeviceUnavailable` if the host cannot enumerate inputs.
#[track_caller]
pub fn input_device_names() -> CoreResult<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceUnavailable {
            reason: format!("Failed to list input devices: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(devices.map(|d| device_label(&d)).collect())
}
