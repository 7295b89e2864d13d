//! Error taxonomy.

use thiserror::Error;

/// Failures surfaced to repository callers.
///
/// Every operation aborts as a whole on the first failure it detects; the
/// repository never reports partial success.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The expected version did not match the stream tail, or a computed
    /// position is already occupied in the target stream.
    #[error("wrong expected version for stream '{stream}'")]
    WrongExpectedVersion {
        /// The stream the conflicting append targeted.
        stream: String,
    },

    /// The event id is already present in the target stream.
    #[error("event '{event_id}' is already present in stream '{stream}'")]
    EventDuplicatedInStream {
        /// The conflicting event id.
        event_id: String,
        /// The stream the append targeted.
        stream: String,
    },

    /// A referenced event id is absent from the store.
    #[error("event not found: '{0}'")]
    EventNotFound(String),

    /// The reserved global-feed name was used as an explicit stream selector.
    #[error("'{0}' is a reserved internal stream name")]
    ReservedInternalName(String),

    /// No reconstruction handler is registered for an event type tag.
    #[error("unknown event type: '{0}'")]
    UnknownEventType(String),

    /// A registered handler rejected a stored payload.
    #[error("failed to reconstruct event '{event_id}' of type '{event_type}': {reason}")]
    Reconstruction {
        /// The event whose payload was rejected.
        event_id: String,
        /// The type tag the handler was resolved for.
        event_type: String,
        /// The handler's rejection message.
        reason: String,
    },

    /// A store-layer failure, propagated unwrapped.
    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

/// Failures surfaced by record-store adapters.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// A unique index rejected an insert.
    #[error("unique index violation on {index}")]
    UniqueViolation {
        /// The index that rejected the insert.
        index: UniqueIndex,
    },

    /// Any other backend failure (connectivity, protocol, IO).
    #[error("record store backend error: {0}")]
    Backend(String),
}

/// The unique indexes every record store must enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueIndex {
    /// `(stream, position)` uniqueness.
    StreamPosition,
    /// `(stream, event_id)` uniqueness.
    StreamEventId,
}

impl std::fmt::Display for UniqueIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamPosition => f.write_str("(stream, position)"),
            Self::StreamEventId => f.write_str("(stream, event_id)"),
        }
    }
}
