//! Domain event abstractions.

use std::any::Any;

/// Trait that reconstructed domain events implement.
///
/// The repository never interprets payload contents; it only carries the type
/// tag through storage and back to the registered reconstruction handler.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type tag (used for reconstruction routing).
    fn event_type(&self) -> &str;

    /// Upcast for downcasting to the concrete event type.
    fn as_any(&self) -> &dyn Any;
}

/// A domain event reconstructed from storage.
#[derive(Debug)]
pub struct RecordedEvent {
    /// Globally unique identifier of the logical domain event.
    pub event_id: String,
    /// Opaque event metadata, copied verbatim from storage.
    pub metadata: serde_json::Value,
    /// The reconstructed domain event.
    pub event: Box<dyn DomainEvent>,
}

impl RecordedEvent {
    /// Downcasts the carried event to a concrete type.
    #[must_use]
    pub fn downcast_ref<E: DomainEvent + 'static>(&self) -> Option<&E> {
        self.event.as_any().downcast_ref::<E>()
    }
}
