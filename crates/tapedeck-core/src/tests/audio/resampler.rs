use crate::Resampler;

const RECORDING_RATE: u32 = 44_100;
const DEVICE_RATE: u32 = 48_000;

/// WHAT: 44.1 kHz converts to exactly the proportional 48 kHz length
/// WHY: Playback duration must match the recording
#[test]
fn given_one_second_at_44k1_when_converting_to_48k_then_length_matches() {
    // Given: One second of a tone
    let mut resampler = Resampler::new(RECORDING_RATE, DEVICE_RATE).unwrap();
    let input: Vec<f32> = (0..RECORDING_RATE as usize)
        .map(|i| (i as f32 * 0.05).sin() * 0.5)
        .collect();

    // When: Converting
    let output = resampler.convert(&input).unwrap();

    // Then: 48000 finite samples, within the input's amplitude range
    assert_eq!(output.len(), DEVICE_RATE as usize);
    assert!(output.iter().all(|s| s.is_finite()));
    assert!(output.iter().all(|s| s.abs() < 1.0));
}

/// WHAT: Equal rates pass samples through unchanged
/// WHY: Devices already at 44.1 kHz need no filtering delay
#[test]
fn given_equal_rates_when_converting_then_passthrough() {
    let mut resampler = Resampler::new(RECORDING_RATE, RECORDING_RATE).unwrap();
    let input = vec![0.1, 0.2, 0.3];

    assert!(resampler.is_passthrough());
    assert_eq!(resampler.convert(&input).unwrap(), input);
}

/// WHAT: Empty input converts to empty output
/// WHY: Edge case handling for zero-length clips
#[test]
fn given_empty_clip_when_converting_then_empty_output() {
    let mut resampler = Resampler::new(RECORDING_RATE, DEVICE_RATE).unwrap();
    assert!(resampler.convert(&[]).unwrap().is_empty());
}

/// WHAT: A zero rate is rejected
/// WHY: A broken device report must not panic the converter
#[test]
fn given_zero_rate_when_creating_then_error() {
    assert!(Resampler::new(0, DEVICE_RATE).is_err());
}

/// WHAT: A converter can be reused for a second clip
/// WHY: State from the first clip must not leak into the next
#[test]
fn given_used_resampler_when_converting_again_then_same_length() {
    let mut resampler = Resampler::new(RECORDING_RATE, DEVICE_RATE).unwrap();
    let input = vec![0.25; 10_000];

    let first = resampler.convert(&input).unwrap();
    let second = resampler.convert(&input).unwrap();

    assert_eq!(first.len(), second.len());
    assert_eq!(first.len(), resampler.output_len(input.len()));
}
