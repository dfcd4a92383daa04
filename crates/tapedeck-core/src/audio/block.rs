/// Samples per block delivered by the input stream.
pub const BLOCK_SIZE: usize = 4096;

/// Capture sample rate requested from the input device.
pub const SAMPLE_RATE: u32 = 44_100;

/// Upper bound of the input gain multiplier.
pub const MAX_GAIN: f32 = 2.0;

/// One fixed-size block of mono input.
///
/// Holds both the device samples and the gain that was in effect when the
/// block was assembled. Metering reads the raw samples and applies `gain`
/// itself; capture stores [`SampleBlock::samples`], which already carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    sequence: u64,
    raw: Vec<f32>,
    gained: Vec<f32>,
    gain: f32,
}

impl SampleBlock {
    /// Build a block from device samples, applying `gain` to the stored copy.
    pub fn new(sequence: u64, raw: Vec<f32>, gain: f32) -> Self {
        let gain = clamp_gain(gain);
        let gained = raw.iter().map(|s| s * gain).collect();

        Self {
            sequence,
            raw,
            gained,
            gain,
        }
    }

    /// Arrival order, starting at zero for each opened stream.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Samples before the gain stage.
    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Samples after the gain stage.
    pub fn samples(&self) -> &[f32] {
        &self.gained
    }

    /// Gain multiplier applied to [`SampleBlock::samples`].
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Number of samples in the block.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Clamp a gain multiplier into `[0, MAX_GAIN]`. NaN becomes unity.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        1.0
    } else {
        gain.clamp(0.0, MAX_GAIN)
    }
}
