use crate::{AudioError, CoreResult, audio::WAVEFORM_CEILING_LEN, codec::EncodedAudio};

use std::{fmt, panic::Location};

use chrono::{DateTime, Local, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Characters that are replaced with `_` in recording names.
pub const UNSAFE_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// A trimmed, non-empty recording name free of path-unsafe characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordingName(String);

impl RecordingName {
    /// Trim and sanitize `input`.
    ///
    /// # Errors
    ///
    /// `InvalidName` when `input` is empty or whitespace only.
    #[track_caller]
    pub fn parse(input: &str) -> CoreResult<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(AudioError::InvalidName {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let sanitized = trimmed
            .chars()
            .map(|c| if UNSAFE_NAME_CHARS.contains(&c) { '_' } else { c })
            .collect();

        Ok(Self(sanitized))
    }

    /// Timestamp-derived name used when no name is supplied.
    pub fn fallback(now: DateTime<Local>) -> Self {
        Self(format!("Recording_{}", now.format("%Y-%m-%d_%H-%M-%S")))
    }

    /// Name as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordingName {
    type Error = AudioError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl From<RecordingName> for String {
    fn from(name: RecordingName) -> Self {
        name.0
    }
}

/// Ask `prompt` for a name until it yields a non-blank one.
///
/// `None` from the prompt means the user cancelled; a timestamp fallback is
/// used instead.
pub fn resolve_name<F>(mut prompt: F, now: DateTime<Local>) -> RecordingName
where
    F: FnMut() -> Option<String>,
{
    loop {
        match prompt() {
            None => {
                let name = RecordingName::fallback(now);
                info!(name = %name, "Name prompt cancelled, using fallback");
                return name;
            }
            Some(input) => match RecordingName::parse(&input) {
                Ok(name) => return name,
                Err(_) => warn!("Recording name was empty, prompting again"),
            },
        }
    }
}

/// A saved recording as held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Unique within the process lifetime.
    pub id: u64,
    /// Sanitized display and file name.
    pub name: RecordingName,
    /// When the recording was saved.
    pub created_at: DateTime<Utc>,
    /// Playable container.
    pub encoded: EncodedAudio,
    /// Decimated live waveform captured at save time, at most 500 points.
    pub waveform_snapshot: Vec<f32>,
    /// Whether a durable copy is known to exist.
    pub is_persistent: bool,
    /// Durable key, set iff `is_persistent`.
    pub storage_key: Option<u64>,
}

impl Recording {
    /// File name for a single download: `<name>.wav`.
    pub fn download_file_name(&self) -> String {
        format!("{}.wav", self.name)
    }

    /// Container size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.encoded.size_bytes()
    }
}

/// Keep only the newest points so a snapshot never exceeds the live ceiling.
pub(crate) fn bound_snapshot(mut snapshot: Vec<f32>) -> Vec<f32> {
    if snapshot.len() > WAVEFORM_CEILING_LEN {
        let excess = snapshot.len() - WAVEFORM_CEILING_LEN;
        snapshot.drain(..excess);
    }
    snapshot
}
