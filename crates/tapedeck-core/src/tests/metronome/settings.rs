use crate::{MetronomeSettings, NoteUnit, next_beat};

use std::time::Duration;

/// WHAT: Tempo and bar length are clamped to their ranges
/// WHY: Typed values outside 40-200 BPM or 1-19 beats must not break timing
#[test]
fn given_out_of_range_values_when_building_settings_then_clamped() {
    let slow = MetronomeSettings::new(10, 0, NoteUnit::Quarter);
    let fast = MetronomeSettings::new(500, 40, NoteUnit::Quarter);

    assert_eq!(slow.bpm(), 40);
    assert_eq!(slow.beats_per_bar(), 1);
    assert_eq!(fast.bpm(), 200);
    assert_eq!(fast.beats_per_bar(), 19);
}

/// WHAT: Interval is 60/bpm scaled by 4/note
/// WHY: Half notes click half as often, eighths twice as often
#[test]
fn given_note_units_when_computing_interval_then_scaled_from_quarter() {
    let quarter = MetronomeSettings::new(120, 4, NoteUnit::Quarter);
    let half = MetronomeSettings::new(120, 4, NoteUnit::Half);
    let eighth = MetronomeSettings::new(120, 4, NoteUnit::Eighth);

    assert_eq!(quarter.interval(), Duration::from_millis(500));
    assert_eq!(half.interval(), Duration::from_millis(1000));
    assert_eq!(eighth.interval(), Duration::from_millis(250));
}

/// WHAT: Only 2, 4 and 8 are valid note units
/// WHY: Other denominators have no defined click spacing
#[test]
fn given_denominators_when_converting_then_only_2_4_8_accepted() {
    assert_eq!(NoteUnit::try_from(2u8), Ok(NoteUnit::Half));
    assert_eq!(NoteUnit::try_from(8u8), Ok(NoteUnit::Eighth));
    assert!(NoteUnit::try_from(3u8).is_err());
    assert_eq!(u8::from(NoteUnit::Quarter), 4);
}

/// WHAT: Beats wrap back to 1 after the last beat of the bar
/// WHY: Beat 1 carries the accent
#[test]
fn given_last_beat_when_advancing_then_wraps_to_one() {
    assert_eq!(next_beat(1, 4), 2);
    assert_eq!(next_beat(4, 4), 1);
    assert_eq!(next_beat(1, 1), 1);
}

/// WHAT: Settings display as "<bpm> BPM, <beats>/<note>"
/// WHY: Used in status output
#[test]
fn given_settings_when_displaying_then_time_signature_shown() {
    let settings = MetronomeSettings::new(96, 3, NoteUnit::Eighth);
    assert_eq!(settings.to_string(), "96 BPM, 3/8");
}
