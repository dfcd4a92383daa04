use crate::{AudioOutput, SoundSink, audio::OutputMixer};

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// WHAT: Voices are mixed and duplicated across output channels
/// WHY: Mono recordings and clicks must play on stereo devices
#[test]
fn given_two_voices_when_filling_stereo_then_sum_on_both_channels() {
    // Given: Two short voices
    let mut mixer = OutputMixer::default();
    let a = mixer.add(vec![0.25; 4], None);
    let _b = mixer.add(vec![0.5; 2], None);

    // When: Filling four stereo frames
    let mut out = vec![9.0; 8];
    mixer.fill(&mut out, 2);

    // Then: Both channels carry the sum while both voices play
    assert_eq!(&out[..4], &[0.75, 0.75, 0.75, 0.75]);
    assert_eq!(&out[4..], &[0.25, 0.25, 0.25, 0.25]);
    assert!(a.is_finished());
    assert_eq!(mixer.active(), 0);
}

/// WHAT: The mix is clamped to [-1, 1]
/// WHY: Overlapping clicks and playback must not wrap or distort wildly
#[test]
fn given_loud_voices_when_filling_then_output_clamped() {
    let mut mixer = OutputMixer::default();
    mixer.add(vec![0.8; 2], None);
    mixer.add(vec![0.8; 2], None);

    let mut out = vec![0.0; 2];
    mixer.fill(&mut out, 1);

    assert_eq!(out, vec![1.0, 1.0]);
}

/// WHAT: A revoked voice is dropped at the next fill
/// WHY: Deleting a recording must stop its playback
#[test]
fn given_revoked_voice_when_filling_then_silence_and_finished() {
    // Given: A long voice with a revocation flag
    let mut mixer = OutputMixer::default();
    let revoked = Arc::new(AtomicBool::new(false));
    let handle = mixer.add(vec![0.5; 100], Some(Arc::clone(&revoked)));
    let mut out = vec![0.0; 10];
    mixer.fill(&mut out, 1);
    assert!(!handle.is_finished());

    // When: Revoking and filling again
    revoked.store(true, Ordering::SeqCst);
    mixer.fill(&mut out, 1);

    // Then: Silence and the voice is gone
    assert!(out.iter().all(|s| *s == 0.0));
    assert!(handle.is_finished());
}

/// WHAT: Stopping a handle silences only that voice
/// WHY: Starting a new playback stops the previous one without muting clicks
#[test]
fn given_stopped_handle_when_filling_then_other_voices_continue() {
    let mut mixer = OutputMixer::default();
    let playback = mixer.add(vec![0.5; 10], None);
    let _click = mixer.add(vec![0.1; 10], None);

    playback.stop();
    let mut out = vec![0.0; 4];
    mixer.fill(&mut out, 1);

    assert!(out.iter().all(|s| (s - 0.1).abs() < 1e-6));
    assert_eq!(mixer.active(), 1);
}

/// WHAT: Default output plays a sound
/// WHY: Verifies real hardware output end to end
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn given_default_output_when_playing_then_voice_finishes() {
    let mut output = AudioOutput::open(None).unwrap();
    let handle = output.handle();
    let rate = handle.sample_rate();
    let voice = handle.play(vec![0.0; rate as usize / 10], None);
    std::thread::sleep(std::time::Duration::from_millis(500));
    assert!(voice.is_finished());
    output.close();
}
