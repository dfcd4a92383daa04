mod durable;
mod fs_store;
mod recording;
mod recording_store;

pub use {
    durable::{DurableRecordingEntry, DurableStore, NewDurableEntry},
    fs_store::FsDurableStore,
    recording::{Recording, RecordingName, UNSAFE_NAME_CHARS, resolve_name},
    recording_store::{Created, DurableOutcome, DurableTicket, PlaybackLease, RecordingStore},
};

#[cfg(test)]
pub(crate) use memory_store::MemoryDurableStore;
