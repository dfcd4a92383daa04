use crate::{
    MeterScaling, PLAYBACK_WAVEFORM_POINTS, PlaybackWaveform, SAMPLE_RATE, decimate, encode_wav,
    playback_waveform, playback_waveform_or_snapshot,
};

/// WHAT: Decoded recordings yield exactly 700 points
/// WHY: The playback display has a fixed width
#[test]
fn given_one_second_recording_when_generating_then_700_points() {
    // Given: One second of a half-scale square wave
    let samples: Vec<f32> = (0..SAMPLE_RATE as usize)
        .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect();
    let encoded = encode_wav(&samples, SAMPLE_RATE).unwrap();

    // When: Generating the playback waveform
    let points = playback_waveform(encoded.bytes(), &MeterScaling::default()).unwrap();

    // Then: 700 points, each clamped at 2.0 (rms*10 = 5)
    assert_eq!(points.len(), PLAYBACK_WAVEFORM_POINTS);
    assert!(points.iter().all(|p| (p - 2.0).abs() < 1e-3));
}

/// WHAT: Each point covers floor(n / 700) samples
/// WHY: Matches the live formula so both displays agree
#[test]
fn given_loud_first_block_when_decimating_then_only_first_point_loud() {
    // Given: 1400 samples, the first two loud
    let mut samples = vec![0.0; 1400];
    samples[0] = 0.1;
    samples[1] = 0.1;

    // When: Decimating (block size 2)
    let points = decimate(&samples, &MeterScaling::default());

    // Then: First point = max(0.1*10, 0.1*5) = 1.0, the rest are silent
    assert!((points[0] - 1.0).abs() < 1e-5);
    assert!(points[1..].iter().all(|p| *p == 0.0));
}

/// WHAT: Clips shorter than 700 samples pad with silence
/// WHY: Short recordings must not produce NaN or panic
#[test]
fn given_short_clip_when_decimating_then_padded_with_zeros() {
    let points = decimate(&[0.2; 10], &MeterScaling::default());

    assert_eq!(points.len(), PLAYBACK_WAVEFORM_POINTS);
    assert!(points[..10].iter().all(|p| *p > 0.0));
    assert!(points[10..].iter().all(|p| *p == 0.0));
    assert!(points.iter().all(|p| p.is_finite()));
}

/// WHAT: Undecodable bytes fall back to the stored snapshot
/// WHY: Playback must not fail because the waveform cannot be computed
#[test]
fn given_corrupt_bytes_when_generating_then_snapshot_used() {
    // Given: Corrupt bytes and a stored snapshot
    let snapshot = vec![0.3, 0.6, 0.9];

    // When: Generating with fallback
    let waveform =
        playback_waveform_or_snapshot(b"RIFF....junk", &snapshot, &MeterScaling::default());

    // Then: The snapshot comes back, flagged as fallback
    assert!(waveform.is_fallback());
    assert_eq!(waveform, PlaybackWaveform::Snapshot(snapshot.clone()));
    assert_eq!(waveform.points(), snapshot.as_slice());
}
