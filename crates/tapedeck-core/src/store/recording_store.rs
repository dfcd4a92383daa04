//! Ordered in-memory recordings mirrored to a durable store in the background.
//!
//! The in-memory list is authoritative. Durable writes and deletes run as
//! tasks in a [`JoinSet`]; their outcomes are applied by
//! [`RecordingStore::sync_durable`], which only ever touches `is_persistent`
//! and `storage_key`. List membership changes only through `create`,
//! `restore_all` and `delete`.
//!
//! `create` and `delete` spawn onto the current Tokio runtime and must be
//! called from within one.

use crate::{
    AudioError, CoreResult,
    codec::EncodedAudio,
    store::{
        DurableStore, NewDurableEntry, Recording, RecordingName, recording::bound_snapshot,
    },
};

use std::{
    collections::HashMap,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::Utc;
use error_location::ErrorLocation;
use tokio::{sync::oneshot, task::JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Result of one background durable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurableOutcome {
    /// Recording `id` was written under `storage_key`.
    Stored {
        /// In-memory recording id.
        id: u64,
        /// Key assigned by the durable store.
        storage_key: u64,
    },
    /// Writing recording `id` failed.
    WriteFailed {
        /// In-memory recording id.
        id: u64,
    },
    /// Entry `storage_key` was removed.
    Deleted {
        /// Durable key.
        storage_key: u64,
    },
    /// Removing entry `storage_key` failed.
    DeleteFailed {
        /// Durable key.
        storage_key: u64,
    },
}

/// Handle to a background durable operation. Dropping it is fine; the
/// outcome is still applied to the store.
#[derive(Debug)]
pub struct DurableTicket {
    rx: Option<oneshot::Receiver<DurableOutcome>>,
}

impl DurableTicket {
    fn none() -> Self {
        Self { rx: None }
    }

    /// Wait for the operation. `None` when the store is memory-only or the
    /// task was cancelled.
    pub async fn outcome(self) -> Option<DurableOutcome> {
        match self.rx {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }
}

/// A freshly created recording and its pending durable write.
#[derive(Debug)]
pub struct Created {
    /// Copy of the recording as it was appended.
    pub recording: Recording,
    /// Background write.
    pub durable: DurableTicket,
}

/// Shared read access to a recording's bytes for playback.
///
/// Revoked when the recording is deleted; players should stop once
/// [`PlaybackLease::is_revoked`] turns true.
#[derive(Debug, Clone)]
pub struct PlaybackLease {
    id: u64,
    encoded: EncodedAudio,
    revoked: Arc<AtomicBool>,
}

impl PlaybackLease {
    /// Recording id the lease belongs to.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Leased container.
    pub fn encoded(&self) -> &EncodedAudio {
        &self.encoded
    }

    /// Whether the recording has been deleted since the lease was taken.
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    /// Shared revocation flag, for handing to an audio callback.
    pub fn revocation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.revoked)
    }
}

/// Ordered recording collection with optional durable mirroring.
pub struct RecordingStore<S: DurableStore> {
    recordings: Vec<Recording>,
    last_id: u64,
    durable: Option<Arc<S>>,
    leases: HashMap<u64, Arc<AtomicBool>>,
    tasks: JoinSet<DurableOutcome>,
}

impl<S: DurableStore> RecordingStore<S> {
    /// Store mirroring to `durable`.
    pub fn new(durable: Arc<S>) -> Self {
        Self::build(Some(durable))
    }

    /// Store without durability; every recording stays `is_persistent = false`.
    pub fn memory_only() -> Self {
        warn!("Durable store unavailable, recordings are kept in memory only");
        Self::build(None)
    }

    /// Store from the result of opening a durable store, degrading to
    /// memory-only on failure.
    pub fn from_open_result(opened: CoreResult<S>) -> Self {
        match opened {
            Ok(store) => Self::new(Arc::new(store)),
            Err(e) => {
                error!(error = %e, "Failed to open durable store");
                Self::memory_only()
            }
        }
    }

    fn build(durable: Option<Arc<S>>) -> Self {
        Self {
            recordings: Vec::new(),
            last_id: 0,
            durable,
            leases: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Whether a durable store is attached.
    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Durable store, if attached.
    pub fn durable(&self) -> Option<&Arc<S>> {
        self.durable.as_ref()
    }

    /// Append a new recording and start mirroring it.
    ///
    /// Never fails: the recording is usable immediately whatever the durable
    /// write does.
    #[instrument(skip(self, encoded, waveform_snapshot), fields(name = %name))]
    pub fn create(
        &mut self,
        encoded: EncodedAudio,
        name: RecordingName,
        waveform_snapshot: Vec<f32>,
    ) -> Created {
        self.sync_durable();

        self.last_id += 1;
        let recording = Recording {
            id: self.last_id,
            name,
            created_at: Utc::now(),
            encoded,
            waveform_snapshot: bound_snapshot(waveform_snapshot),
            is_persistent: false,
            storage_key: None,
        };

        self.recordings.push(recording.clone());
        self.leases
            .insert(recording.id, Arc::new(AtomicBool::new(false)));

        info!(
            id = recording.id,
            size_bytes = recording.size_bytes(),
            "Recording created"
        );

        let durable = match self.durable.clone() {
            Some(store) => self.spawn_write(store, &recording),
            None => {
                debug!(id = recording.id, "Memory-only, skipping durable write");
                DurableTicket::none()
            }
        };

        Created { recording, durable }
    }

    fn spawn_write(&mut self, store: Arc<S>, recording: &Recording) -> DurableTicket {
        let id = recording.id;
        let entry = NewDurableEntry {
            name: recording.name.to_string(),
            created_at: recording.created_at,
            mime_type: recording.encoded.mime_type().to_string(),
            audio: recording.encoded.shared_bytes(),
            waveform_snapshot: recording.waveform_snapshot.clone(),
            size_bytes: recording.size_bytes() as u64,
        };

        let (ticket_tx, ticket_rx) = oneshot::channel();

        self.tasks.spawn(async move {
            let outcome = match store.add(entry).await {
                Ok(storage_key) => {
                    info!(id, storage_key, "Recording stored durably");
                    DurableOutcome::Stored { id, storage_key }
                }
                Err(e) => {
                    error!(id, error = %e, "Durable write failed");
                    DurableOutcome::WriteFailed { id }
                }
            };
            let _ = ticket_tx.send(outcome.clone());
            outcome
        });

        DurableTicket { rx: Some(ticket_rx) }
    }

    fn spawn_delete(&mut self, store: Arc<S>, storage_key: u64) -> DurableTicket {
        let (ticket_tx, ticket_rx) = oneshot::channel();

        self.tasks.spawn(async move {
            let outcome = match store.delete(storage_key).await {
                Ok(()) => {
                    debug!(storage_key, "Durable entry deleted");
                    DurableOutcome::Deleted { storage_key }
                }
                Err(e) => {
                    error!(storage_key, error = %e, "Durable delete failed");
                    DurableOutcome::DeleteFailed { storage_key }
                }
            };
            let _ = ticket_tx.send(outcome.clone());
            outcome
        });

        DurableTicket { rx: Some(ticket_rx) }
    }

    /// Recordings in insertion order.
    pub fn list(&self) -> &[Recording] {
        &self.recordings
    }

    /// Number of recordings.
    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    /// Whether there are no recordings.
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// Recording with `id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such recording exists.
    #[track_caller]
    pub fn get(&self, id: u64) -> CoreResult<&Recording> {
        self.recordings
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AudioError::NotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Lease the bytes of recording `id` for playback.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such recording exists.
    #[track_caller]
    pub fn lease(&mut self, id: u64) -> CoreResult<PlaybackLease> {
        let encoded = self.get(id)?.encoded.clone();
        let revoked = Arc::clone(
            self.leases
                .entry(id)
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        );

        Ok(PlaybackLease {
            id,
            encoded,
            revoked,
        })
    }

    /// Remove recording `id`, revoke its leases and delete its durable copy.
    ///
    /// Returns `false` (and does nothing) when the id is unknown, so deleting
    /// twice is harmless. The durable delete is best effort.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> bool {
        self.sync_durable();

        let Some(index) = self.recordings.iter().position(|r| r.id == id) else {
            debug!(id, "Delete of unknown recording ignored");
            return false;
        };

        let recording = self.recordings.remove(index);

        if let Some(flag) = self.leases.remove(&id) {
            flag.store(true, Ordering::Release);
        }

        if let (true, Some(storage_key), Some(store)) = (
            recording.is_persistent,
            recording.storage_key,
            self.durable.clone(),
        ) {
            let _ticket = self.spawn_delete(store, storage_key);
        }

        info!(id, name = %recording.name, "Recording deleted");

        true
    }

    /// Load every durable entry not already in memory.
    ///
    /// Pending durable operations are settled first. Entries are matched
    /// against loaded recordings by storage key. A restored recording keeps
    /// its durable key as id unless that id was already handed out in this
    /// process, in which case it gets a fresh one; the id counter moves past
    /// every id in use. Returns the number restored, 0 when there is no store
    /// or reading it fails.
    #[instrument(skip(self))]
    pub async fn restore_all(&mut self) -> usize {
        let Some(store) = self.durable.clone() else {
            return 0;
        };

        self.settle().await;

        let entries = match store.get_all().await {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to read durable store");
                return 0;
            }
        };

        let issued = self.last_id;
        let highest_key = entries.iter().map(|e| e.id).max().unwrap_or(0);
        self.last_id = self.last_id.max(highest_key);

        let mut restored = 0;
        for entry in entries {
            if self
                .recordings
                .iter()
                .any(|r| r.storage_key == Some(entry.id))
            {
                warn!(storage_key = entry.id, "Durable entry already loaded, skipping");
                continue;
            }

            let id = if entry.id > issued && !self.recordings.iter().any(|r| r.id == entry.id) {
                entry.id
            } else {
                self.last_id += 1;
                debug!(storage_key = entry.id, id = self.last_id, "Key already used as id, reassigning");
                self.last_id
            };

            let name = RecordingName::parse(&entry.name).unwrap_or_else(|_| {
                warn!(id = entry.id, "Stored name empty, using fallback");
                RecordingName::fallback(entry.created_at.with_timezone(&chrono::Local))
            });

            self.leases.insert(id, Arc::new(AtomicBool::new(false)));
            self.recordings.push(Recording {
                id,
                name,
                created_at: entry.created_at,
                encoded: EncodedAudio::from_parts(entry.audio, entry.mime_type),
                waveform_snapshot: bound_snapshot(entry.waveform_snapshot),
                is_persistent: true,
                storage_key: Some(entry.id),
            });
            restored += 1;
        }

        info!(restored, next_id = self.last_id + 1, "Recordings restored");

        restored
    }

    /// Apply every durable outcome that has arrived, without waiting.
    pub fn sync_durable(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.apply_joined(joined);
        }
    }

    /// Wait until every background durable operation has finished and been
    /// applied. A task that panicked counts as finished.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.apply_joined(joined);
        }
    }

    /// Number of durable operations not yet applied.
    pub fn pending_durable(&self) -> usize {
        self.tasks.len()
    }

    fn apply_joined(&mut self, joined: Result<DurableOutcome, tokio::task::JoinError>) {
        match joined {
            Ok(outcome) => self.apply(outcome),
            // The recording keeps whatever state it had; writes start non-persistent.
            Err(e) => error!(error = %e, "Durable task did not complete"),
        }
    }

    fn apply(&mut self, outcome: DurableOutcome) {
        match outcome {
            DurableOutcome::Stored { id, storage_key } => {
                match self.recordings.iter_mut().find(|r| r.id == id) {
                    Some(recording) => {
                        recording.is_persistent = true;
                        recording.storage_key = Some(storage_key);
                    }
                    None => {
                        // Deleted while the write was in flight.
                        if let Some(store) = self.durable.clone() {
                            info!(id, storage_key, "Removing durable copy of deleted recording");
                            let _ticket = self.spawn_delete(store, storage_key);
                        }
                    }
                }
            }
            DurableOutcome::WriteFailed { id } => {
                if let Some(recording) = self.recordings.iter_mut().find(|r| r.id == id) {
                    recording.is_persistent = false;
                    recording.storage_key = None;
                }
            }
            DurableOutcome::Deleted { .. } | DurableOutcome::DeleteFailed { .. } => {}
        }
    }
}

impl<S: DurableStore> Drop for RecordingStore<S> {
    fn drop(&mut self) {
        // Let in-flight writes finish on the runtime instead of aborting them.
        self.tasks.detach_all();
    }
}
