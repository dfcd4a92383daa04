use crate::{
    AudioError, CoreResult,
    export::{ArchiveWriter, ExportBundle, MANIFEST_FILE_NAME},
};

use std::{fs::File, io::BufWriter, panic::Location, path::Path};

use error_location::ErrorLocation;
use flate2::{Compression, write::GzEncoder};
use tracing::{info, instrument};

/// Gzip-compressed tar archive writer.
#[derive(Debug, Clone, Copy)]
pub struct TarGzArchive {
    level: u32,
}

impl Default for TarGzArchive {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl TarGzArchive {
    /// Writer using gzip `level` (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[track_caller]
fn export_failure(reason: String) -> AudioError {
    AudioError::ExportFailure {
        reason,
        location: ErrorLocation::from(Location::caller()),
    }
}

impl ArchiveWriter for TarGzArchive {
    fn extension(&self) -> &'static str {
        "tar.gz"
    }

    #[instrument(skip(self, bundle), fields(entries = bundle.entries.len()))]
    fn write_archive(&self, bundle: &ExportBundle, path: &Path) -> CoreResult<()> {
        let file = File::create(path)
            .map_err(|e| export_failure(format!("Failed to create {:?}: {}", path, e)))?;

        let encoder = GzEncoder::new(BufWriter::new(file), Compression::new(self.level));
        let mut builder = tar::Builder::new(encoder);
        let mtime = u64::try_from(bundle.exported_at.timestamp()).unwrap_or(0);

        let files = bundle
            .entries
            .iter()
            .map(|e| (e.file_name.as_str(), &e.bytes[..]))
            .chain(std::iter::once((
                MANIFEST_FILE_NAME,
                bundle.manifest.as_bytes(),
            )));

        for (name, bytes) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(bytes.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(mtime);
            header.set_cksum();

            builder
                .append_data(&mut header, name, bytes)
                .map_err(|e| export_failure(format!("Failed to add {}: {}", name, e)))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| export_failure(format!("Failed to finish tar stream: {}", e)))?;
        let mut writer = encoder
            .finish()
            .map_err(|e| export_failure(format!("Failed to finish gzip stream: {}", e)))?;
        std::io::Write::flush(&mut writer)
            .map_err(|e| export_failure(format!("Failed to flush archive: {}", e)))?;

        info!(archive = ?path, total_bytes = bundle.total_bytes(), "Export archive written");

        Ok(())
    }
}
