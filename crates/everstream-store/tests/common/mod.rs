//! Shared setup for repository integration tests.

use std::sync::Arc;

use everstream_core::record::EventRecord;
use everstream_core::store::RecordStore;
use everstream_store::EventRepository;
use everstream_test_support::{MemoryRecordStore, fixture_record, test_registry};

/// A repository over a fresh in-memory store, plus the store itself for
/// direct inspection.
pub fn repository() -> (EventRepository, Arc<MemoryRecordStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let repo = EventRepository::new(dyn_store, Arc::new(test_registry()));
    (repo, store)
}

/// A fixture event with a deterministic id.
pub fn event(id: &str) -> EventRecord {
    fixture_record(id).with_event_id(id)
}
