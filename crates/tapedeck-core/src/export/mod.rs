//! Bulk export: one WAV per recording plus a plain-text manifest.
//!
//! [`ExportBundle`] only assembles names, bytes and the manifest. Turning the
//! bundle into a single file is the job of an [`ArchiveWriter`].

mod tar_gz;

pub use tar_gz::TarGzArchive;

use crate::{AudioError, CoreResult, store::Recording};

use std::{fmt::Write as _, panic::Location, path::Path, sync::Arc};

use chrono::{DateTime, Local};
use error_location::ErrorLocation;
use tracing::{debug, instrument};

/// File name of the manifest inside an export.
pub const MANIFEST_FILE_NAME: &str = "recordings_manifest.txt";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One file of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    /// Name inside the archive.
    pub file_name: String,
    /// File contents.
    pub bytes: Arc<[u8]>,
}

/// Everything needed to write an export archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    /// Recordings in list order, named `NNN_<name>.wav`.
    pub entries: Vec<ExportEntry>,
    /// Manifest text.
    pub manifest: String,
    /// When the bundle was assembled.
    pub exported_at: DateTime<Local>,
}

impl ExportBundle {
    /// Assemble a bundle from `recordings`.
    ///
    /// # Errors
    ///
    /// `ExportFailure` when there is nothing to export.
    #[track_caller]
    #[instrument(skip(recordings), fields(count = recordings.len()))]
    pub fn build(recordings: &[Recording], exported_at: DateTime<Local>) -> CoreResult<Self> {
        if recordings.is_empty() {
            return Err(AudioError::ExportFailure {
                reason: "nothing to export".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let entries = recordings
            .iter()
            .enumerate()
            .map(|(index, recording)| ExportEntry {
                file_name: format!("{:03}_{}.wav", index + 1, recording.name),
                bytes: recording.encoded.shared_bytes(),
            })
            .collect();

        let manifest = manifest(recordings, exported_at);

        debug!(manifest_len = manifest.len(), "Export bundle assembled");

        Ok(Self {
            entries,
            manifest,
            exported_at,
        })
    }

    /// Suggested archive file stem, `tapedeck_export_<timestamp>`.
    pub fn archive_stem(&self) -> String {
        format!(
            "tapedeck_export_{}",
            self.exported_at.format("%Y-%m-%dT%H-%M-%S")
        )
    }

    /// Total size of all recordings in bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.bytes.len()).sum()
    }
}

fn megabytes(bytes: usize) -> String {
    format!("{:.2}", bytes as f64 / BYTES_PER_MB)
}

/// Render the manifest text for `recordings`.
pub fn manifest(recordings: &[Recording], exported_at: DateTime<Local>) -> String {
    let total: usize = recordings.iter().map(Recording::size_bytes).sum();

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Tapedeck - Audio Export");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Export date: {}", exported_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Recordings: {}", recordings.len());
    let _ = writeln!(out, "Total size: {} MB", megabytes(total));
    let _ = writeln!(out);
    let _ = writeln!(out, "Recording details:");
    let _ = writeln!(out, "------------------");

    for (index, recording) in recordings.iter().enumerate() {
        let created = recording.created_at.with_timezone(&Local);
        let _ = writeln!(out, "{:03}. {}", index + 1, recording.name);
        let _ = writeln!(out, "     Recorded: {}", created.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "     Size: {} MB", megabytes(recording.size_bytes()));
        let _ = writeln!(out, "     Format: {}", recording.encoded.mime_type());
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Notes:");
    let _ = writeln!(out, "- All files are WAV (16-bit PCM, mono)");
    let _ = writeln!(out, "- Files are numbered in recording order");
    let _ = writeln!(out, "- Compatible with all common audio editors");

    out
}

/// Writes an [`ExportBundle`] as a single archive file.
pub trait ArchiveWriter {
    /// File extension of produced archives, without the dot.
    fn extension(&self) -> &'static str;

    /// Write `bundle` to `path`.
    ///
    /// # Errors
    ///
    /// `ExportFailure` if the archive cannot be written.
    fn write_archive(&self, bundle: &ExportBundle, path: &Path) -> CoreResult<()>;
}
