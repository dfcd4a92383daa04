//! Directory-backed durable store.
//!
//! Layout under the store directory:
//!
//! ```text
//! store.json      {"next_id": N}
//! 000007.json     entry metadata (name, created_at, mime type, snapshot, size)
//! 000007.wav      container bytes
//! ```
//!
//! The metadata file is written last, so an entry without one was never
//! committed and is ignored. Every file is written to a temp path, synced
//! and renamed into place.

use crate::{
    AudioError, CoreResult,
    store::{
        DurableRecordingEntry, DurableStore, NewDurableEntry,
        durable::EntryMetadata,
    },
};

use std::{
    io::ErrorKind,
    panic::Location,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info, instrument, warn};

const STATE_FILE: &str = "store.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoreState {
    next_id: u64,
}

/// Durable recording store on the local filesystem.
#[derive(Debug)]
pub struct FsDurableStore {
    dir: PathBuf,
    /// Next key to hand out. Held for the whole `add` so keys stay unique.
    next_id: Mutex<u64>,
}

impl FsDurableStore {
    /// Open (creating if needed) the store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// `DurableStoreUnavailable` if the directory cannot be created or read.
    #[instrument]
    pub async fn open(dir: PathBuf) -> CoreResult<Self> {
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AudioError::DurableStoreUnavailable {
                reason: format!("Failed to create store directory {:?}: {}", dir, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let stored_next = match fs::read(dir.join(STATE_FILE)).await {
            Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes)
                .map(|s| s.next_id)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Store state unreadable, recomputing next id");
                    1
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => 1,
            Err(e) => {
                return Err(AudioError::DurableStoreUnavailable {
                    reason: format!("Failed to read store state: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let ids = list_ids(&dir)
            .await
            .map_err(|e| AudioError::DurableStoreUnavailable {
                reason: format!("Failed to list store directory {:?}: {}", dir, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let next_id = ids
            .iter()
            .max()
            .map_or(stored_next, |max| stored_next.max(max + 1));

        info!(store_dir = ?dir, entries = ids.len(), next_id, "Durable store opened");

        Ok(Self {
            dir,
            next_id: Mutex::new(next_id),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn metadata_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{:06}.json", id))
    }

    fn audio_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{:06}.wav", id))
    }

    async fn read_metadata(&self, id: u64) -> std::io::Result<EntryMetadata> {
        let bytes = fs::read(self.metadata_path(id)).await?;
        serde_json::from_slice(&bytes).map_err(std::io::Error::other)
    }

    async fn load_entry(&self, metadata: EntryMetadata) -> std::io::Result<DurableRecordingEntry> {
        let audio = fs::read(self.audio_path(metadata.id)).await?;
        Ok(metadata.into_entry(Arc::from(audio)))
    }

    /// Metadata of every committed entry in key order. Unreadable entries are
    /// skipped with a warning.
    async fn all_metadata(&self) -> CoreResult<Vec<EntryMetadata>> {
        let ids = list_ids(&self.dir)
            .await
            .map_err(|e| AudioError::DurableStoreUnavailable {
                reason: format!("Failed to list store directory: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_metadata(id).await {
                Ok(meta) => out.push(meta),
                Err(e) => warn!(id, error = %e, "Skipping unreadable store entry"),
            }
        }
        Ok(out)
    }

    async fn load_matching<F>(&self, keep: F) -> CoreResult<Vec<DurableRecordingEntry>>
    where
        F: Fn(&EntryMetadata) -> bool + Send + Sync,
    {
        let mut out = Vec::new();
        for meta in self.all_metadata().await?.into_iter().filter(|m| keep(m)) {
            let id = meta.id;
            match self.load_entry(meta).await {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(id, error = %e, "Skipping store entry without audio"),
            }
        }
        Ok(out)
    }
}

impl DurableStore for FsDurableStore {
    #[instrument(skip(self, entry), fields(name = %entry.name, size_bytes = entry.size_bytes))]
    async fn add(&self, entry: NewDurableEntry) -> CoreResult<u64> {
        let mut next_id = self.next_id.lock().await;
        let id = *next_id;
        let entry = entry.with_id(id);

        let write_failure = |e: std::io::Error| AudioError::DurableWriteFailure {
            reason: format!("Failed to write entry {}: {}", id, e),
            location: ErrorLocation::from(Location::caller()),
        };

        let metadata = serde_json::to_vec_pretty(&EntryMetadata::from_entry(&entry))
            .map_err(|e| write_failure(std::io::Error::other(e)))?;

        write_atomic(&self.audio_path(id), &entry.audio)
            .await
            .map_err(write_failure)?;
        write_atomic(&self.metadata_path(id), &metadata)
            .await
            .map_err(write_failure)?;

        *next_id = id + 1;
        let state = serde_json::to_vec(&StoreState { next_id: *next_id })
            .map_err(|e| write_failure(std::io::Error::other(e)))?;
        if let Err(e) = write_atomic(&self.dir.join(STATE_FILE), &state).await {
            // Keys stay unique anyway: open() also scans existing entries.
            warn!(error = %e, "Failed to persist next id");
        }

        debug!(id, "Entry written");

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: u64) -> CoreResult<()> {
        for path in [self.metadata_path(key), self.audio_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AudioError::DurableDeleteFailure {
                        storage_key: key,
                        reason: format!("Failed to remove {:?}: {}", path, e),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }

        debug!(key, "Entry deleted");

        Ok(())
    }

    async fn get_all(&self) -> CoreResult<Vec<DurableRecordingEntry>> {
        self.load_matching(|_| true).await
    }

    async fn find_by_name(&self, name: &str) -> CoreResult<Vec<DurableRecordingEntry>> {
        self.load_matching(|m| m.name == name).await
    }

    async fn find_by_created_at(
        &self,
        created_at: DateTime<Utc>,
    ) -> CoreResult<Vec<DurableRecordingEntry>> {
        self.load_matching(|m| m.created_at == created_at).await
    }
}

/// Keys of committed entries (those with a metadata file), ascending.
async fn list_ids(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut ids = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            ids.push(id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await
}
