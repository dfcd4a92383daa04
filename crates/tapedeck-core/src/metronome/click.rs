use std::f32::consts::TAU;

/// Length of one click.
pub const CLICK_SECONDS: f32 = 0.1;

const ATTACK_SECONDS: f32 = 0.005;
const DECAY_SECONDS: f32 = 0.02;
const RELEASE_SECONDS: f32 = 0.03;
const RELEASE_FLOOR: f32 = 0.001;

/// Pitch and envelope of one kind of click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoice {
    /// Sine frequency in Hz.
    pub frequency: f32,
    /// Level reached at the end of the attack.
    pub peak: f32,
    /// Level held between decay and release.
    pub sustain: f32,
}

impl ClickVoice {
    /// Regular beat.
    pub const NORMAL: Self = Self {
        frequency: 800.0,
        peak: 0.18,
        sustain: 0.10,
    };

    /// First beat of the bar.
    pub const ACCENT: Self = Self {
        frequency: 1200.0,
        peak: 0.25,
        sustain: 0.15,
    };

    /// Voice for a beat.
    pub fn for_beat(accent: bool) -> Self {
        if accent { Self::ACCENT } else { Self::NORMAL }
    }

    /// Envelope level `t` seconds into the click.
    pub fn envelope(&self, t: f32) -> f32 {
        let release_start = CLICK_SECONDS - RELEASE_SECONDS;

        if t < 0.0 || t >= CLICK_SECONDS {
            0.0
        } else if t < ATTACK_SECONDS {
            self.peak * t / ATTACK_SECONDS
        } else if t < ATTACK_SECONDS + DECAY_SECONDS {
            let progress = (t - ATTACK_SECONDS) / DECAY_SECONDS;
            self.peak + (self.sustain - self.peak) * progress
        } else if t < release_start {
            self.sustain
        } else {
            let progress = (t - release_start) / RELEASE_SECONDS;
            self.sustain + (RELEASE_FLOOR - self.sustain) * progress
        }
    }
}

/// Render one click at `sample_rate`.
pub fn synth_click(voice: ClickVoice, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate.max(1) as f32;
    let len = (CLICK_SECONDS * rate).round() as usize;

    (0..len)
        .map(|n| {
            let t = n as f32 / rate;
            (TAU * voice.frequency * t).sin() * voice.envelope(t)
        })
        .collect()
}
