//! Record model: the serialized write-side form and the persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serialized form of a domain event as callers hand it to the repository.
///
/// `data` and `metadata` are opaque payloads, copied verbatim and never
/// interpreted by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Globally unique identifier of the logical domain event.
    pub event_id: String,
    /// Fully-qualified type tag used to reconstruct the event on read.
    pub event_type: String,
    /// Opaque event payload.
    pub data: serde_json::Value,
    /// Opaque event metadata.
    pub metadata: serde_json::Value,
}

impl EventRecord {
    /// Creates a record with a freshly generated v4 id.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            data,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Replaces the metadata payload.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replaces the event id.
    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }
}

/// A record as handed to the store for insertion.
///
/// `inserted_at` is assigned by the store, which is why it is absent here.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Name of the owning stream (possibly the reserved global-feed name).
    pub stream: String,
    /// Globally unique identifier of the logical domain event.
    pub event_id: String,
    /// Fully-qualified type tag.
    pub event_type: String,
    /// Opaque event payload.
    pub data: serde_json::Value,
    /// Opaque event metadata.
    pub metadata: serde_json::Value,
    /// Sequence position within the stream; absent for global-feed mirrors
    /// and for streams written with the "any" expected version.
    pub position: Option<i64>,
}

/// A record as persisted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Name of the owning stream (possibly the reserved global-feed name).
    pub stream: String,
    /// Globally unique identifier of the logical domain event.
    pub event_id: String,
    /// Fully-qualified type tag.
    pub event_type: String,
    /// Opaque event payload.
    pub data: serde_json::Value,
    /// Opaque event metadata.
    pub metadata: serde_json::Value,
    /// Sequence position within the stream, when positional ordering applies.
    pub position: Option<i64>,
    /// Monotonic creation timestamp assigned by the store at insert time.
    pub inserted_at: DateTime<Utc>,
}

impl StoredRecord {
    /// The serialized write-side form of this record.
    #[must_use]
    pub fn to_event_record(&self) -> EventRecord {
        EventRecord {
            event_id: self.event_id.clone(),
            event_type: self.event_type.clone(),
            data: self.data.clone(),
            metadata: self.metadata.clone(),
        }
    }
}
