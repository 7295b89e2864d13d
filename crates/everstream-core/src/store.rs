//! Record store abstraction and the query plan handed to adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RecordStoreError;
use crate::record::{NewRecord, StoredRecord};
use crate::specification::Direction;

/// Equality and range predicates over the record collection.
///
/// All bounds are exclusive; they carry the values resolved from a bounding
/// event's own record, never the bounding id itself.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Equality on the persisted stream name.
    pub stream: Option<String>,
    /// `event_id` membership.
    pub event_ids: Option<Vec<String>>,
    /// `event_type` membership.
    pub event_types: Option<Vec<String>>,
    /// Records with `position` strictly above this value.
    pub position_above: Option<i64>,
    /// Records with `position` strictly below this value.
    pub position_below: Option<i64>,
    /// Records inserted strictly after this instant.
    pub inserted_after: Option<DateTime<Utc>>,
    /// Records inserted strictly before this instant.
    pub inserted_before: Option<DateTime<Utc>>,
}

impl RecordFilter {
    /// A filter matching every record of a stream.
    #[must_use]
    pub fn stream(name: impl Into<String>) -> Self {
        Self {
            stream: Some(name.into()),
            ..Self::default()
        }
    }

    /// A filter matching every record carrying the given event id.
    #[must_use]
    pub fn event_id(id: impl Into<String>) -> Self {
        Self {
            event_ids: Some(vec![id.into()]),
            ..Self::default()
        }
    }
}

/// Fields a query plan may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// The per-stream sequence position.
    Position,
    /// The store-assigned insertion timestamp.
    InsertedAt,
    /// The store's private insertion identity, used as a stable tiebreak.
    /// Never exposed on records.
    Identity,
}

/// A fully ordered, bounded query over the record collection.
///
/// Built by the read-scope builder and handed opaquely to the store adapter;
/// adapters translate it without re-deriving any ordering logic.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Which records qualify.
    pub filter: RecordFilter,
    /// Sort keys in priority order, each with its direction.
    pub sort: Vec<(SortField, Direction)>,
    /// Records to skip from the front of the ordered result.
    pub skip: Option<u64>,
    /// Maximum records to return.
    pub limit: Option<u64>,
}

impl QueryPlan {
    /// An unordered, unbounded plan over the given filter.
    #[must_use]
    pub fn filtered(filter: RecordFilter) -> Self {
        Self {
            filter,
            sort: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    /// Appends a sort key.
    #[must_use]
    pub fn sorted_by(mut self, field: SortField, direction: Direction) -> Self {
        self.sort.push((field, direction));
        self
    }

    /// Sets the limit.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// This plan with every sort direction flipped.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        for (_, direction) in &mut self.sort {
            *direction = direction.reversed();
        }
        self
    }
}

/// A flat collection of stored event records, queryable by equality and range
/// predicates, sortable, and supporting bulk insert.
///
/// The store is the sole synchronization point between concurrent writers: it
/// must enforce `(stream, position)` and `(stream, event_id)` uniqueness and
/// reject violating inserts with
/// [`RecordStoreError::UniqueViolation`]. `inserted_at` is assigned at insert
/// time and must be monotonic within the store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a batch of records as one bulk call.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::UniqueViolation`] when the batch violates
    /// a unique index; nothing from the batch is persisted in that case.
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<(), RecordStoreError>;

    /// Executes a query plan and returns the matching records in plan order.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the query cannot be executed.
    async fn find(&self, plan: &QueryPlan) -> Result<Vec<StoredRecord>, RecordStoreError>;

    /// Returns the first record of a query plan, if any.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the query cannot be executed.
    async fn find_one(&self, plan: &QueryPlan) -> Result<Option<StoredRecord>, RecordStoreError> {
        let mut limited = plan.clone();
        limited.limit = Some(1);
        Ok(self.find(&limited).await?.into_iter().next())
    }

    /// Counts the records a plan matches, honoring its limit but without
    /// materializing rows.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the query cannot be executed.
    async fn count(&self, plan: &QueryPlan) -> Result<u64, RecordStoreError>;

    /// Deletes every record the filter matches; returns how many.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the delete cannot be executed.
    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, RecordStoreError>;

    /// Rewrites `event_type`, `data` and `metadata` in place on every stored
    /// copy carrying the given event id, across all streams. Ordering fields
    /// are untouched. Returns how many copies were rewritten.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the update cannot be executed.
    async fn update_event(
        &self,
        event_id: &str,
        event_type: &str,
        data: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<u64, RecordStoreError>;
}
