//! Plain-text rendering of meters, waveforms and recording rows.

use std::time::Duration;

use chrono::Local;
use tapedeck_core::{LevelReading, MeterZone, Recording};

/// Width of the level bar in characters.
pub(crate) const METER_WIDTH: usize = 30;

/// Columns of a playback sparkline.
pub(crate) const SPARKLINE_WIDTH: usize = 70;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// `#` for the filled part of a 0-100 level, `-` for the rest.
pub(crate) fn meter_bar(level: f32, width: usize) -> String {
    let filled = ((level / 100.0).clamp(0.0, 1.0) * width as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

/// `MM:SS.t`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let tenths = elapsed.as_millis() / 100;
    format!(
        "{:02}:{:02}.{}",
        tenths / 600,
        (tenths / 10) % 60,
        tenths % 10
    )
}

fn zone_label(zone: MeterZone) -> &'static str {
    match zone {
        MeterZone::Normal => "ok",
        MeterZone::Hot => "HOT",
        MeterZone::Clipping => "CLIP",
    }
}

/// One status line: level bar, percentage, zone, and when present the
/// capture time and metronome beat.
pub(crate) fn meter_line(reading: &LevelReading, elapsed: Option<Duration>, beat: u32) -> String {
    let mut line = format!(
        "[{}] {:>3.0}% {:<4}",
        meter_bar(reading.meter_level, METER_WIDTH),
        reading.meter_level,
        zone_label(reading.zone)
    );

    match elapsed {
        Some(elapsed) => line.push_str(&format!("  REC {}", format_elapsed(elapsed))),
        None => line.push_str("  monitoring"),
    }

    if beat > 0 {
        line.push_str(&format!("  beat {}", beat));
    }

    line
}

/// Waveform as block characters, at most `width` columns. Each column shows
/// the largest point it covers, scaled against `ceiling`.
pub(crate) fn sparkline(points: &[f32], ceiling: f32, width: usize) -> String {
    if points.is_empty() || width == 0 || ceiling <= 0.0 {
        return String::new();
    }

    let columns = width.min(points.len());
    (0..columns)
        .map(|column| {
            let start = column * points.len() / columns;
            let end = ((column + 1) * points.len() / columns).max(start + 1);
            let loudest = points[start..end].iter().fold(0.0f32, |m, p| m.max(*p));
            let index = ((loudest / ceiling).clamp(0.0, 1.0) * (BARS.len() - 1) as f32).round();
            BARS[index as usize]
        })
        .collect()
}

/// One row of the recordings list.
pub(crate) fn recording_line(recording: &Recording) -> String {
    format!(
        "#{:<4} {:<32} {}  {:>9.1} KB  {}",
        recording.id,
        recording.name.as_str(),
        recording
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S"),
        recording.size_bytes() as f64 / 1024.0,
        if recording.is_persistent { "saved" } else { "memory" }
    )
}
