//! Event type registry — reconstruction handlers keyed by type tag.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::EventStoreError;
use crate::event::{DomainEvent, RecordedEvent};
use crate::record::StoredRecord;

/// Reconstruction handler: builds a domain event from its stored payload.
pub type ReconstructFn =
    Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn DomainEvent>, serde_json::Error> + Send + Sync>;

/// Mapping from event type tag to reconstruction handler.
///
/// Injected into the repository by the caller; reading a record whose tag has
/// no registered handler is a caller-visible
/// [`EventStoreError::UnknownEventType`], never silently swallowed.
#[derive(Default)]
pub struct EventTypeRegistry {
    handlers: HashMap<String, ReconstructFn>,
}

impl EventTypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `serde`-deserializable event type under `event_type`.
    pub fn register<E>(&mut self, event_type: impl Into<String>)
    where
        E: DomainEvent + DeserializeOwned + 'static,
    {
        self.register_fn(
            event_type,
            Box::new(|data| {
                let event: E = serde_json::from_value(data.clone())?;
                Ok(Box::new(event) as Box<dyn DomainEvent>)
            }),
        );
    }

    /// Registers an arbitrary reconstruction handler under `event_type`.
    pub fn register_fn(&mut self, event_type: impl Into<String>, handler: ReconstructFn) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Reconstructs a domain event from a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::UnknownEventType`] when no handler is
    /// registered for the record's type tag, and
    /// [`EventStoreError::Reconstruction`] when the handler rejects the
    /// payload.
    pub fn reconstruct(&self, record: &StoredRecord) -> Result<RecordedEvent, EventStoreError> {
        let handler = self
            .handlers
            .get(&record.event_type)
            .ok_or_else(|| EventStoreError::UnknownEventType(record.event_type.clone()))?;

        let event = handler(&record.data).map_err(|e| EventStoreError::Reconstruction {
            event_id: record.event_id.clone(),
            event_type: record.event_type.clone(),
            reason: e.to_string(),
        })?;

        Ok(RecordedEvent {
            event_id: record.event_id.clone(),
            metadata: record.metadata.clone(),
            event,
        })
    }
}

impl std::fmt::Debug for EventTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTypeRegistry")
            .field("event_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use chrono::Utc;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        seq: i64,
    }

    impl DomainEvent for Ping {
        fn event_type(&self) -> &str {
            "test.ping"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn stored(event_type: &str, data: serde_json::Value) -> StoredRecord {
        StoredRecord {
            stream: "s".to_owned(),
            event_id: "e1".to_owned(),
            event_type: event_type.to_owned(),
            data,
            metadata: serde_json::json!({"source": "test"}),
            position: Some(1),
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_reconstructs_registered_type() {
        let mut registry = EventTypeRegistry::new();
        registry.register::<Ping>("test.ping");

        let recorded = registry
            .reconstruct(&stored("test.ping", serde_json::json!({"seq": 7})))
            .unwrap();

        assert_eq!(recorded.event_id, "e1");
        assert_eq!(recorded.metadata, serde_json::json!({"source": "test"}));
        assert_eq!(recorded.downcast_ref::<Ping>(), Some(&Ping { seq: 7 }));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = EventTypeRegistry::new();

        let result = registry.reconstruct(&stored("test.pong", serde_json::json!({})));

        assert!(matches!(
            result,
            Err(EventStoreError::UnknownEventType(tag)) if tag == "test.pong"
        ));
    }
}
