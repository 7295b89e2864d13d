//! Shared test fixtures for the Everstream event log.

mod clock;
mod events;
mod memory;

pub use clock::FixedClock;
pub use events::{TEST_EVENT_TYPE, TestEvent, fixture_record, test_registry};
pub use memory::MemoryRecordStore;
