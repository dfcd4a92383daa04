use crate::{DurableStore, MemoryDurableStore, NewDurableEntry};

use std::sync::Arc;

use chrono::{TimeZone, Utc};

fn entry(name: &str, minute: u32) -> NewDurableEntry {
    NewDurableEntry {
        name: name.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
        mime_type: "audio/wav".to_string(),
        audio: Arc::from(vec![1u8, 2, 3]),
        waveform_snapshot: vec![0.5],
        size_bytes: 3,
    }
}

/// WHAT: Keys are auto-incremented from 1
/// WHY: Durable ids double as recording ids after restore
#[tokio::test]
async fn given_empty_store_when_adding_then_keys_increment() {
    let store = MemoryDurableStore::new();

    assert_eq!(store.add(entry("a", 0)).await.unwrap(), 1);
    assert_eq!(store.add(entry("b", 1)).await.unwrap(), 2);
    assert_eq!(store.len(), 2);
}

/// WHAT: Secondary lookups return every match
/// WHY: Name and creation-time indexes are non-unique
#[tokio::test]
async fn given_duplicate_names_when_finding_by_name_then_all_returned() {
    // Given: Two entries named "take" and one other
    let store = MemoryDurableStore::new();
    store.add(entry("take", 0)).await.unwrap();
    store.add(entry("other", 0)).await.unwrap();
    store.add(entry("take", 5)).await.unwrap();

    // When: Looking up
    let by_name = store.find_by_name("take").await.unwrap();
    let at_noon = store
        .find_by_created_at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        .await
        .unwrap();

    // Then: Both indexes return all matches
    assert_eq!(by_name.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(at_noon.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
}

/// WHAT: Failure switches make operations fail
/// WHY: Lets higher layers be tested against store errors
#[tokio::test]
async fn given_failing_writes_when_adding_then_error_and_nothing_stored() {
    let store = MemoryDurableStore::new();
    store.set_fail_writes(true);

    assert!(store.add(entry("a", 0)).await.is_err());
    assert!(store.is_empty());
}
