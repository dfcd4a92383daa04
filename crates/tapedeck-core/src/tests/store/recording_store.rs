use crate::{
    DurableOutcome, DurableRecordingEntry, FsDurableStore, MemoryDurableStore, RecordingName,
    RecordingStore, tests::support::tone_wav,
};

use std::sync::Arc;

use chrono::Utc;

fn stored_entry(id: u64, name: &str) -> DurableRecordingEntry {
    let encoded = tone_wav(100);
    DurableRecordingEntry {
        id,
        name: name.to_string(),
        created_at: Utc::now(),
        mime_type: encoded.mime_type().to_string(),
        size_bytes: encoded.size_bytes() as u64,
        audio: encoded.shared_bytes(),
        waveform_snapshot: vec![0.5; 10],
    }
}

fn name(text: &str) -> RecordingName {
    RecordingName::parse(text).unwrap()
}

/// WHAT: Restoring ids {2,5,7} advances the counter so the next id is 8
/// WHY: New recordings must never collide with restored ones
#[tokio::test]
async fn given_store_with_ids_2_5_7_when_restoring_then_next_create_gets_8() {
    // Given: A durable store with three entries
    let durable = Arc::new(MemoryDurableStore::with_entries([
        stored_entry(2, "two"),
        stored_entry(5, "five"),
        stored_entry(7, "seven"),
    ]));
    let mut store = RecordingStore::new(durable);

    // When: Restoring and creating a new recording
    let restored = store.restore_all().await;
    let created = store.create(tone_wav(10), name("new"), Vec::new());

    // Then: Three persistent recordings, new id is 8
    assert_eq!(restored, 3);
    assert!(store.list()[..3].iter().all(|r| r.is_persistent));
    assert_eq!(
        store.list()[..3].iter().map(|r| r.storage_key).collect::<Vec<_>>(),
        vec![Some(2), Some(5), Some(7)]
    );
    assert_eq!(created.recording.id, 8);
}

/// WHAT: A failing durable write leaves the recording usable but not persistent
/// WHY: Durability failures never block or roll back the in-memory list
#[tokio::test]
async fn given_failing_store_when_creating_then_listed_immediately_and_not_persistent() {
    // Given: A store whose writes fail
    let durable = Arc::new(MemoryDurableStore::new());
    durable.set_fail_writes(true);
    let mut store = RecordingStore::new(Arc::clone(&durable));

    // When: Creating a recording
    let created = store.create(tone_wav(10), name("Take"), vec![0.1]);

    // Then: It is listed at once, and stays non-persistent once the write settles
    assert_eq!(store.len(), 1);
    assert!(!created.recording.is_persistent);
    assert_eq!(
        created.durable.outcome().await,
        Some(DurableOutcome::WriteFailed { id: 1 })
    );
    store.settle().await;
    assert!(!store.get(1).unwrap().is_persistent);
    assert_eq!(store.get(1).unwrap().storage_key, None);
}

/// WHAT: A successful write sets is_persistent and storage_key
/// WHY: Later deletes need the key to remove the durable copy
#[tokio::test]
async fn given_working_store_when_write_settles_then_persistent_with_key() {
    let durable = Arc::new(MemoryDurableStore::new());
    let mut store = RecordingStore::new(Arc::clone(&durable));

    store.create(tone_wav(10), name("Take"), vec![0.1]);
    store.settle().await;

    let recording = store.get(1).unwrap();
    assert!(recording.is_persistent);
    assert_eq!(recording.storage_key, Some(1));
    assert!(durable.contains(1));
}

/// WHAT: Deleting twice is a harmless no-op the second time
/// WHY: Delete must be idempotent
#[tokio::test]
async fn given_deleted_recording_when_deleting_again_then_no_op() {
    // Given: A persisted recording
    let durable = Arc::new(MemoryDurableStore::new());
    let mut store = RecordingStore::new(Arc::clone(&durable));
    store.create(tone_wav(10), name("Take"), Vec::new());
    store.settle().await;

    // When: Deleting it twice
    let first = store.delete(1);
    let second = store.delete(1);
    store.settle().await;

    // Then: Only the first did anything, durable copy gone
    assert!(first);
    assert!(!second);
    assert!(store.is_empty());
    assert!(!durable.contains(1));
}

/// WHAT: A failing durable delete still removes the recording from memory
/// WHY: Durable delete is best effort
#[tokio::test]
async fn given_failing_delete_when_deleting_then_removed_from_memory() {
    let durable = Arc::new(MemoryDurableStore::new());
    let mut store = RecordingStore::new(Arc::clone(&durable));
    store.create(tone_wav(10), name("Take"), Vec::new());
    store.settle().await;
    durable.set_fail_deletes(true);

    assert!(store.delete(1));
    store.settle().await;

    assert!(store.get(1).is_err());
    assert!(durable.contains(1));
}

/// WHAT: Deleting revokes outstanding playback leases
/// WHY: Players must stop once the recording is gone
#[tokio::test]
async fn given_leased_recording_when_deleting_then_lease_revoked() {
    let mut store: RecordingStore<MemoryDurableStore> = RecordingStore::memory_only();
    store.create(tone_wav(10), name("Take"), Vec::new());
    let lease = store.lease(1).unwrap();
    assert!(!lease.is_revoked());

    store.delete(1);

    assert!(lease.is_revoked());
    assert!(store.lease(1).is_err());
}

/// WHAT: A write finishing after delete removes the orphaned durable copy
/// WHY: Durable state must converge with memory
#[tokio::test]
async fn given_delete_before_write_settles_when_settling_then_durable_copy_removed() {
    // Given: A recording deleted before its background write has run
    let durable = Arc::new(MemoryDurableStore::new());
    let mut store = RecordingStore::new(Arc::clone(&durable));
    store.create(tone_wav(10), name("Take"), Vec::new());
    assert!(store.delete(1));

    // When: The write completes and its outcome is applied
    store.settle().await;

    // Then: The freshly written entry has been removed again
    assert!(store.is_empty());
    assert!(durable.is_empty());
    assert_eq!(store.pending_durable(), 0);
}

/// WHAT: Memory-only mode restores nothing and never persists
/// WHY: An unavailable store degrades instead of failing
#[tokio::test]
async fn given_memory_only_store_when_creating_then_never_persistent() {
    let mut store: RecordingStore<MemoryDurableStore> = RecordingStore::memory_only();

    assert_eq!(store.restore_all().await, 0);
    let created = store.create(tone_wav(10), name("Take"), Vec::new());
    assert!(created.durable.outcome().await.is_none());
    store.settle().await;
    assert!(!store.get(1).unwrap().is_persistent);
    assert!(!store.is_durable());
}

/// WHAT: Recordings survive a restart through the filesystem store
/// WHY: Session recovery is the point of the durable mirror
#[tokio::test]
async fn given_saved_recordings_when_restarting_then_restored_in_order() {
    // Given: Two recordings saved in a first session
    let dir = tempfile::TempDir::new().unwrap();
    {
        let mut store =
            RecordingStore::from_open_result(FsDurableStore::open(dir.path().to_path_buf()).await);
        store.create(tone_wav(100), name("First"), vec![0.2; 600]);
        store.create(tone_wav(200), name("Second"), vec![0.3]);
        store.settle().await;
    }

    // When: Opening a second session
    let mut store =
        RecordingStore::from_open_result(FsDurableStore::open(dir.path().to_path_buf()).await);
    let restored = store.restore_all().await;

    // Then: Both come back persistent, in order, snapshot bounded to 500
    assert_eq!(restored, 2);
    let names: Vec<_> = store.list().iter().map(|r| r.name.to_string()).collect();
    assert_eq!(names, vec!["First", "Second"]);
    assert!(store.list().iter().all(|r| r.is_persistent));
    assert_eq!(store.list()[0].waveform_snapshot.len(), 500);
    assert_eq!(store.list()[1].encoded.bytes(), tone_wav(200).bytes());
}

/// WHAT: Restoring after a create matches entries by storage key
/// WHY: An in-memory id and a durable key are unrelated numbers
#[tokio::test]
async fn given_recording_created_before_restore_when_restoring_then_each_entry_listed_once() {
    // Given: A stored entry under key 1 and a new recording that takes id 1
    let durable = Arc::new(MemoryDurableStore::with_entries([stored_entry(1, "old")]));
    let mut store = RecordingStore::new(Arc::clone(&durable));
    store.create(tone_wav(10), name("new"), Vec::new());
    store.settle().await;

    // When: Restoring
    let restored = store.restore_all().await;

    // Then: "old" comes back under a fresh id, "new" is not duplicated
    assert_eq!(restored, 1);
    let listed: Vec<_> = store
        .list()
        .iter()
        .map(|r| (r.id, r.name.to_string(), r.storage_key))
        .collect();
    assert_eq!(
        listed,
        vec![
            (1, "new".to_string(), Some(2)),
            (3, "old".to_string(), Some(1)),
        ]
    );
    assert_eq!(store.create(tone_wav(10), name("next"), Vec::new()).recording.id, 4);
}

/// WHAT: Restoring twice loads nothing the second time
/// WHY: Entries already in memory must not be listed again
#[tokio::test]
async fn given_restored_store_when_restoring_again_then_nothing_added() {
    let durable = Arc::new(MemoryDurableStore::with_entries([
        stored_entry(2, "two"),
        stored_entry(5, "five"),
    ]));
    let mut store = RecordingStore::new(durable);

    assert_eq!(store.restore_all().await, 2);
    assert_eq!(store.restore_all().await, 0);
    assert_eq!(store.len(), 2);
}

/// WHAT: Restoring right after a create waits for its write first
/// WHY: An unapplied write would otherwise look like an unloaded entry
#[tokio::test]
async fn given_unsettled_write_when_restoring_then_not_duplicated() {
    let durable = Arc::new(MemoryDurableStore::new());
    let mut store = RecordingStore::new(Arc::clone(&durable));
    store.create(tone_wav(10), name("Take"), Vec::new());

    let restored = store.restore_all().await;

    assert_eq!(restored, 0);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(1).unwrap().storage_key, Some(1));
}

/// WHAT: A durable task that panics still lets settle return
/// WHY: Shutdown waits on settle and must never hang
#[tokio::test]
async fn given_panicking_write_when_settling_then_returns_and_not_persistent() {
    // Given: A store whose write task panics
    let durable = Arc::new(MemoryDurableStore::new());
    durable.set_panic_writes(true);
    let mut store = RecordingStore::new(Arc::clone(&durable));
    let created = store.create(tone_wav(10), name("Take"), Vec::new());

    // When: Settling
    store.settle().await;

    // Then: Nothing pending, recording kept in memory only
    assert_eq!(store.pending_durable(), 0);
    assert!(!store.get(1).unwrap().is_persistent);
    assert!(created.durable.outcome().await.is_none());
}
