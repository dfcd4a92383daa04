use crate::{DurableStore, FsDurableStore, NewDurableEntry};

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn entry(name: &str, audio: &[u8]) -> NewDurableEntry {
    NewDurableEntry {
        name: name.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
        mime_type: "audio/wav".to_string(),
        audio: Arc::from(audio.to_vec()),
        waveform_snapshot: vec![0.1, 0.2],
        size_bytes: audio.len() as u64,
    }
}

/// WHAT: Added entries read back with all fields intact
/// WHY: Restored recordings must be byte-identical to what was saved
#[tokio::test]
async fn given_added_entry_when_reading_all_then_fields_match() {
    // Given: A store in a temp directory with one entry
    let dir = TempDir::new().unwrap();
    let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();
    let key = store.add(entry("Verse", b"RIFFdata")).await.unwrap();

    // When: Reading everything back
    let all = store.get_all().await.unwrap();

    // Then: One identical entry
    assert_eq!(all.len(), 1);
    let stored = &all[0];
    assert_eq!(stored.id, key);
    assert_eq!(stored.name, "Verse");
    assert_eq!(&stored.audio[..], b"RIFFdata");
    assert_eq!(stored.waveform_snapshot, vec![0.1, 0.2]);
    assert_eq!(stored.size_bytes, 8);
    assert_eq!(stored.mime_type, "audio/wav");
}

/// WHAT: Keys keep increasing across reopen, even after deletes
/// WHY: Auto-increment keys must never be reused
#[tokio::test]
async fn given_reopened_store_when_adding_then_key_continues() {
    // Given: A store that handed out keys 1 and 2, then deleted 2
    let dir = TempDir::new().unwrap();
    {
        let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();
        store.add(entry("a", b"1")).await.unwrap();
        let second = store.add(entry("b", b"2")).await.unwrap();
        store.delete(second).await.unwrap();
    }

    // When: Reopening and adding
    let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();
    let key = store.add(entry("c", b"3")).await.unwrap();

    // Then: The next key is 3
    assert_eq!(key, 3);
    assert_eq!(store.get_all().await.unwrap().len(), 2);
}

/// WHAT: Deleting a missing key succeeds
/// WHY: Best-effort deletes may race with each other
#[tokio::test]
async fn given_missing_key_when_deleting_then_ok() {
    let dir = TempDir::new().unwrap();
    let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();

    assert!(store.delete(42).await.is_ok());
}

/// WHAT: Name and timestamp lookups filter on metadata
/// WHY: Secondary indexes are part of the store schema
#[tokio::test]
async fn given_entries_when_finding_then_matches_returned() {
    let dir = TempDir::new().unwrap();
    let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();
    store.add(entry("Chorus", b"x")).await.unwrap();
    store.add(entry("Bridge", b"y")).await.unwrap();

    let chorus = store.find_by_name("Chorus").await.unwrap();
    let at = store
        .find_by_created_at(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(chorus.len(), 1);
    assert_eq!(&chorus[0].audio[..], b"x");
    assert_eq!(at.len(), 2);
}

/// WHAT: Audio written without metadata is ignored
/// WHY: The metadata file commits an entry; a half-written one is invisible
#[tokio::test]
async fn given_orphan_audio_file_when_reading_all_then_ignored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("000009.wav"), b"partial").unwrap();

    let store = FsDurableStore::open(dir.path().to_path_buf()).await.unwrap();

    assert!(store.get_all().await.unwrap().is_empty());
    assert_eq!(store.add(entry("a", b"1")).await.unwrap(), 1);
}
