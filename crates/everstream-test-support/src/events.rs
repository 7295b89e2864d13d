//! Event fixtures — a minimal domain event and its registry.

use std::any::Any;

use serde::{Deserialize, Serialize};

use everstream_core::event::DomainEvent;
use everstream_core::record::EventRecord;
use everstream_core::registry::EventTypeRegistry;

/// Type tag the fixtures register and append under.
pub const TEST_EVENT_TYPE: &str = "test.event";

/// A minimal domain event for repository tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEvent {
    /// Arbitrary payload field.
    #[serde(default)]
    pub label: String,
}

impl DomainEvent for TestEvent {
    fn event_type(&self) -> &str {
        TEST_EVENT_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A registry that knows how to reconstruct [`TestEvent`].
#[must_use]
pub fn test_registry() -> EventTypeRegistry {
    let mut registry = EventTypeRegistry::new();
    registry.register::<TestEvent>(TEST_EVENT_TYPE);
    registry
}

/// A serialized [`TestEvent`] record with a fresh v4 id and empty metadata.
#[must_use]
pub fn fixture_record(label: &str) -> EventRecord {
    EventRecord::new(TEST_EVENT_TYPE, serde_json::json!({ "label": label }))
}
