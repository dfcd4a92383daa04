use crate::CoreResult;

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored recording as read back from a durable store.
#[derive(Debug, Clone, PartialEq)]
pub struct DurableRecordingEntry {
    /// Key assigned by the store.
    pub id: u64,
    /// Recording name (secondary index).
    pub name: String,
    /// Save time (secondary index).
    pub created_at: DateTime<Utc>,
    /// Container MIME type.
    pub mime_type: String,
    /// Container bytes.
    pub audio: Arc<[u8]>,
    /// Capture-time waveform snapshot.
    pub waveform_snapshot: Vec<f32>,
    /// Container length in bytes.
    pub size_bytes: u64,
}

/// A recording about to be written; the store assigns the key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDurableEntry {
    /// Recording name.
    pub name: String,
    /// Save time.
    pub created_at: DateTime<Utc>,
    /// Container MIME type.
    pub mime_type: String,
    /// Container bytes.
    pub audio: Arc<[u8]>,
    /// Capture-time waveform snapshot.
    pub waveform_snapshot: Vec<f32>,
    /// Container length in bytes.
    pub size_bytes: u64,
}

impl NewDurableEntry {
    /// Attach the store-assigned key.
    pub fn with_id(self, id: u64) -> DurableRecordingEntry {
        DurableRecordingEntry {
            id,
            name: self.name,
            created_at: self.created_at,
            mime_type: self.mime_type,
            audio: self.audio,
            waveform_snapshot: self.waveform_snapshot,
            size_bytes: self.size_bytes,
        }
    }
}

/// Metadata half of an entry, as serialized next to the audio bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EntryMetadata {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) mime_type: String,
    pub(crate) waveform_snapshot: Vec<f32>,
    pub(crate) size_bytes: u64,
}

impl EntryMetadata {
    pub(crate) fn from_entry(entry: &DurableRecordingEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            created_at: entry.created_at,
            mime_type: entry.mime_type.clone(),
            waveform_snapshot: entry.waveform_snapshot.clone(),
            size_bytes: entry.size_bytes,
        }
    }

    pub(crate) fn into_entry(self, audio: Arc<[u8]>) -> DurableRecordingEntry {
        DurableRecordingEntry {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            mime_type: self.mime_type,
            audio,
            waveform_snapshot: self.waveform_snapshot,
            size_bytes: self.size_bytes,
        }
    }
}

/// Key-value collection of recordings with auto-incrementing integer keys and
/// non-unique lookups by name and creation time.
///
/// Keys are never reused. Every operation is asynchronous; callers that must
/// not block spawn the returned future.
pub trait DurableStore: Send + Sync + 'static {
    /// Store `entry` and return its new key.
    fn add(&self, entry: NewDurableEntry) -> impl Future<Output = CoreResult<u64>> + Send;

    /// Remove the entry under `key`. Removing a missing key succeeds.
    fn delete(&self, key: u64) -> impl Future<Output = CoreResult<()>> + Send;

    /// Every entry in key order.
    fn get_all(&self) -> impl Future<Output = CoreResult<Vec<DurableRecordingEntry>>> + Send;

    /// Entries whose name equals `name`, in key order.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = CoreResult<Vec<DurableRecordingEntry>>> + Send {
        async move {
            let entries = self.get_all().await?;
            Ok(entries.into_iter().filter(|e| e.name == name).collect())
        }
    }

    /// Entries created at exactly `created_at`, in key order.
    fn find_by_created_at(
        &self,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<Vec<DurableRecordingEntry>>> + Send {
        async move {
            let entries = self.get_all().await?;
            Ok(entries
                .into_iter()
                .filter(|e| e.created_at == created_at)
                .collect())
        }
    }
}
