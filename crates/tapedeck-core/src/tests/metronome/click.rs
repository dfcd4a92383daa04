use crate::{CLICK_SECONDS, ClickVoice, synth_click};

const RATE: u32 = 48_000;

/// WHAT: A click lasts 100 ms
/// WHY: Clicks must be short enough not to overlap at 200 BPM eighths
#[test]
fn given_sample_rate_when_synthesizing_then_100ms_of_samples() {
    let click = synth_click(ClickVoice::NORMAL, RATE);
    assert_eq!(click.len(), (CLICK_SECONDS * RATE as f32).round() as usize);
    assert_eq!(click.len(), 4800);
}

/// WHAT: Envelope follows attack, decay, sustain and release
/// WHY: Soft edges avoid audible pops
#[test]
fn given_normal_voice_when_sampling_envelope_then_adsr_levels() {
    let voice = ClickVoice::NORMAL;

    assert_eq!(voice.envelope(0.0), 0.0);
    assert!((voice.envelope(0.005) - 0.18).abs() < 1e-4);
    assert!((voice.envelope(0.025) - 0.10).abs() < 1e-4);
    assert!((voice.envelope(0.05) - 0.10).abs() < 1e-6);
    assert!(voice.envelope(0.099) < 0.01);
    assert_eq!(voice.envelope(0.1), 0.0);
}

/// WHAT: Accent clicks are higher and louder
/// WHY: The first beat of each bar must stand out
#[test]
fn given_accent_when_synthesizing_then_louder_than_normal() {
    let accent = synth_click(ClickVoice::for_beat(true), RATE);
    let normal = synth_click(ClickVoice::for_beat(false), RATE);

    let peak = |s: &[f32]| s.iter().fold(0.0f32, |m, v| m.max(v.abs()));
    assert!(peak(&accent) > peak(&normal));
    assert!(peak(&accent) <= 0.25 + 1e-6);
    assert_eq!(ClickVoice::for_beat(true).frequency, 1200.0);
}
