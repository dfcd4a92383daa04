use crate::{GainControl, MAX_GAIN, SampleBlock, clamp_gain};

/// WHAT: Blocks keep raw samples and apply gain to the stored copy
/// WHY: Analysis needs pre-gain data while capture keeps post-gain data
#[test]
fn given_gain_when_building_block_then_samples_scaled_and_raw_kept() {
    // Given: Raw samples and a gain of 1.5
    let raw = vec![0.2, -0.4, 0.6];

    // When: Building the block
    let block = SampleBlock::new(7, raw.clone(), 1.5);

    // Then: Raw is untouched, samples are scaled
    assert_eq!(block.sequence(), 7);
    assert_eq!(block.raw(), raw.as_slice());
    let expected = [0.3, -0.6, 0.9];
    for (got, want) in block.samples().iter().zip(expected) {
        assert!((got - want).abs() < 1e-6);
    }
}

/// WHAT: Gain is clamped to [0, 2]
/// WHY: Out-of-range gain from config or commands must never reach samples
#[test]
fn given_out_of_range_gain_when_clamping_then_bounded() {
    assert_eq!(clamp_gain(-1.0), 0.0);
    assert_eq!(clamp_gain(5.0), MAX_GAIN);
    assert_eq!(clamp_gain(f32::NAN), 1.0);
    assert_eq!(SampleBlock::new(0, vec![1.0], 3.0).gain(), MAX_GAIN);
}

/// WHAT: Gain changes are visible through every clone of the control
/// WHY: The audio callback holds a clone and must see updates on the next block
#[test]
fn given_cloned_gain_control_when_setting_then_all_clones_see_value() {
    // Given: A control and a clone held elsewhere
    let control = GainControl::default();
    let callback_side = control.clone();
    assert_eq!(callback_side.get(), 1.0);

    // When: Setting an out-of-range value
    let stored = control.set(2.5);

    // Then: The clamped value is shared
    assert_eq!(stored, MAX_GAIN);
    assert_eq!(callback_side.get(), MAX_GAIN);
}
