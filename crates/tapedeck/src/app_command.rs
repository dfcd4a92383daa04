use crate::{AppError, AppResult};

use std::{panic::Location, path::PathBuf, str::SplitWhitespace};

use error_location::ErrorLocation;
use tapedeck_core::NoteUnit;

/// Commands read from the terminal and handled by [`App`](crate::App).
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Open the input and show levels without recording.
    Monitor,
    /// Start capturing, opening the input first if needed.
    Record,
    /// Stop capturing (or monitoring, or playback), saving under `name`.
    Stop {
        /// Name to save under; `None` uses a timestamp.
        name: Option<String>,
    },
    /// Stop monitoring without recording.
    Cancel,
    /// Set input gain.
    Gain {
        /// Gain in percent, 0 to 200.
        percent: f32,
    },
    /// Select the input device; `None` is the system default.
    Device {
        /// Device name.
        name: Option<String>,
    },
    /// Select the output device; `None` is the system default.
    Output {
        /// Device name.
        name: Option<String>,
    },
    /// List available input and output devices.
    Devices,
    /// List recordings.
    List,
    /// Play a recording.
    Play {
        /// Recording id.
        id: u64,
    },
    /// Delete a recording.
    Delete {
        /// Recording id.
        id: u64,
    },
    /// Export every recording into one archive.
    Export {
        /// Target directory; `None` uses the configured export directory.
        dir: Option<PathBuf>,
    },
    /// Save one recording as a WAV file.
    Download {
        /// Recording id.
        id: u64,
        /// Target directory; `None` uses the configured export directory.
        dir: Option<PathBuf>,
    },
    /// Start or stop the metronome.
    Metronome {
        /// `true` to start.
        on: bool,
    },
    /// Set the metronome tempo.
    Bpm(u32),
    /// Set the metronome bar length.
    Beats(u32),
    /// Set the metronome note unit.
    Note(NoteUnit),
    /// Print the command list.
    Help,
    /// Request application shutdown.
    Quit,
}

/// Command reference printed by `help`.
pub(crate) const HELP: &str = "\
Commands:
  monitor              open the input and show levels
  record               start recording (monitors first if needed)
  stop [name]          stop and save; stops monitoring or playback too
  cancel               stop monitoring without recording
  gain <0-200>         input gain in percent
  device [name]        select input device (no name = default)
  output [name]        select output device (no name = default)
  devices              list audio devices
  list                 list recordings
  play <id>            play a recording and show its waveform
  delete <id>          delete a recording
  export [dir]         write all recordings into one archive
  download <id> [dir]  write one recording as <name>.wav
  metronome on|off     start or stop the click track
  bpm <40-200>         metronome tempo
  beats <1-19>         beats per bar
  note <2|4|8>         clicked note value
  help                 show this list
  quit                 exit";

impl AppCommand {
    /// Parse one non-empty input line.
    #[track_caller]
    pub fn parse(line: &str) -> AppResult<Self> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(unknown(line, "empty command"));
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "monitor" => AppCommand::Monitor,
            "record" | "rec" => AppCommand::Record,
            "stop" => AppCommand::Stop {
                name: rest(line, verb),
            },
            "cancel" => AppCommand::Cancel,
            "gain" => {
                let percent: f32 = number(line, words.next(), "gain needs a percentage")?;
                if !(0.0..=200.0).contains(&percent) {
                    return Err(unknown(line, "gain must be between 0 and 200"));
                }
                AppCommand::Gain { percent }
            }
            "device" => AppCommand::Device {
                name: rest(line, verb),
            },
            "output" => AppCommand::Output {
                name: rest(line, verb),
            },
            "devices" => AppCommand::Devices,
            "list" | "ls" => AppCommand::List,
            "play" => AppCommand::Play {
                id: number(line, words.next(), "play needs a recording id")?,
            },
            "delete" | "rm" => AppCommand::Delete {
                id: number(line, words.next(), "delete needs a recording id")?,
            },
            "export" => AppCommand::Export {
                dir: rest(line, verb).map(PathBuf::from),
            },
            "download" => {
                let id = number(line, words.next(), "download needs a recording id")?;
                AppCommand::Download {
                    id,
                    dir: remaining(words).map(PathBuf::from),
                }
            }
            "metronome" | "click" => match words.next() {
                Some("on") => AppCommand::Metronome { on: true },
                Some("off") => AppCommand::Metronome { on: false },
                _ => return Err(unknown(line, "use 'metronome on' or 'metronome off'")),
            },
            "bpm" => AppCommand::Bpm(number(line, words.next(), "bpm needs a tempo")?),
            "beats" => AppCommand::Beats(number(line, words.next(), "beats needs a count")?),
            "note" => {
                let value: u8 = number(line, words.next(), "note needs 2, 4 or 8")?;
                AppCommand::Note(NoteUnit::try_from(value).map_err(|reason| unknown(line, &reason))?)
            }
            "help" | "?" => AppCommand::Help,
            "quit" | "exit" | "q" => AppCommand::Quit,
            _ => return Err(unknown(line, "type 'help' for the command list")),
        };

        Ok(command)
    }
}

/// Everything after the verb, trimmed; `None` when blank.
fn rest(line: &str, verb: &str) -> Option<String> {
    let tail = line[verb.len()..].trim();
    (!tail.is_empty()).then(|| tail.to_string())
}

fn remaining(words: SplitWhitespace<'_>) -> Option<String> {
    let joined = words.collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

#[track_caller]
fn number<T: std::str::FromStr>(line: &str, word: Option<&str>, missing: &str) -> AppResult<T> {
    match word.and_then(|w| w.parse().ok()) {
        Some(value) => Ok(value),
        None => Err(unknown(line, missing)),
    }
}

#[track_caller]
fn unknown(line: &str, reason: &str) -> AppError {
    AppError::UnknownCommand {
        input: line.to_string(),
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
