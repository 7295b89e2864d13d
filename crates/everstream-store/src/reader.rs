//! Stream reader: executes read scopes and reconstructs domain events.

use std::sync::Arc;

use everstream_core::error::EventStoreError;
use everstream_core::event::RecordedEvent;
use everstream_core::record::StoredRecord;
use everstream_core::registry::EventTypeRegistry;
use everstream_core::specification::{Direction, Specification};
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore, SortField};
use everstream_core::stream::Stream;

use crate::scope::{build_scope, ensure_not_reserved};

/// Page size used when a batched read does not name one.
pub(crate) const DEFAULT_BATCH_SIZE: u64 = 100;

/// Executes read specifications against the record store and maps the stored
/// records back to domain events through the injected registry.
#[derive(Clone)]
pub struct RepositoryReader {
    store: Arc<dyn RecordStore>,
    registry: Arc<EventTypeRegistry>,
}

impl RepositoryReader {
    /// Creates a reader over the given store and registry.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, registry: Arc<EventTypeRegistry>) -> Self {
        Self { store, registry }
    }

    /// Reads every record the specification matches, in resolved order.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::ReservedInternalName`] when the reserved
    /// global-feed name is used as an explicit selector,
    /// [`EventStoreError::EventNotFound`] when a `start`/`stop` bound is
    /// absent from the scope, and [`EventStoreError::UnknownEventType`] when
    /// a record's type tag has no registered handler.
    pub async fn read(&self, spec: &Specification) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let plan = build_scope(self.store.as_ref(), spec).await?;
        let records = self.store.find(&plan).await?;
        self.reconstruct_all(&records)
    }

    /// Reads the single leading record of the scope, if any.
    ///
    /// # Errors
    ///
    /// As for [`RepositoryReader::read`].
    pub async fn read_first(
        &self,
        spec: &Specification,
    ) -> Result<Option<RecordedEvent>, EventStoreError> {
        let plan = build_scope(self.store.as_ref(), spec).await?;
        self.reconstruct_opt(self.store.find_one(&plan).await?.as_ref())
    }

    /// Reads the single trailing record of the scope, if any.
    ///
    /// # Errors
    ///
    /// As for [`RepositoryReader::read`].
    pub async fn read_last(
        &self,
        spec: &Specification,
    ) -> Result<Option<RecordedEvent>, EventStoreError> {
        let plan = build_scope(self.store.as_ref(), spec).await?;
        // The trailing record of a scope leads its reversal. A limit applies
        // to the original order, so a limited window must be materialized.
        if plan.limit.is_some() {
            let records = self.store.find(&plan).await?;
            return self.reconstruct_opt(records.last());
        }
        self.reconstruct_opt(self.store.find_one(&plan.reversed()).await?.as_ref())
    }

    /// Opens a lazy, restartable-by-offset batched read over the scope.
    ///
    /// Each page re-executes the scope with a skip/limit pair; the overall
    /// limit, when present, bounds the total across pages.
    ///
    /// # Errors
    ///
    /// As for [`RepositoryReader::read`]; bound resolution happens up front.
    pub async fn read_in_batches(
        &self,
        spec: &Specification,
    ) -> Result<BatchReader, EventStoreError> {
        let plan = build_scope(self.store.as_ref(), spec).await?;
        Ok(BatchReader {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            remaining: plan.limit,
            plan,
            batch_size: spec.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            offset: 0,
            done: false,
        })
    }

    /// Counts the records the specification matches, without materializing
    /// rows. Subject to the same reserved-name guard as `read`.
    ///
    /// # Errors
    ///
    /// As for [`RepositoryReader::read`], minus reconstruction failures.
    pub async fn count(&self, spec: &Specification) -> Result<u64, EventStoreError> {
        let plan = build_scope(self.store.as_ref(), spec).await?;
        Ok(self.store.count(&plan).await?)
    }

    /// The newest event of a stream by resolved order, if any.
    ///
    /// # Errors
    ///
    /// Returns store and reconstruction errors.
    pub async fn last_stream_event(
        &self,
        stream: &Stream,
    ) -> Result<Option<RecordedEvent>, EventStoreError> {
        ensure_not_reserved(stream)?;
        let order_field = if stream.is_global() {
            SortField::InsertedAt
        } else {
            SortField::Position
        };
        let plan = QueryPlan::filtered(RecordFilter::stream(stream.serialized_name()))
            .sorted_by(order_field, Direction::Backward)
            .sorted_by(SortField::Identity, Direction::Backward);
        self.reconstruct_opt(self.store.find_one(&plan).await?.as_ref())
    }

    fn reconstruct_all(
        &self,
        records: &[StoredRecord],
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        records
            .iter()
            .map(|record| self.registry.reconstruct(record))
            .collect()
    }

    fn reconstruct_opt(
        &self,
        record: Option<&StoredRecord>,
    ) -> Result<Option<RecordedEvent>, EventStoreError> {
        record
            .map(|record| self.registry.reconstruct(record))
            .transpose()
    }
}

/// A lazy sequence of fixed-size pages over a read scope.
///
/// Every page request is an independent store round trip; the reader is
/// exhausted once a short or empty page comes back or the overall limit is
/// spent.
pub struct BatchReader {
    store: Arc<dyn RecordStore>,
    registry: Arc<EventTypeRegistry>,
    plan: QueryPlan,
    batch_size: u64,
    remaining: Option<u64>,
    offset: u64,
    done: bool,
}

impl BatchReader {
    /// Fetches the next page, or `None` once the scope is exhausted.
    ///
    /// # Errors
    ///
    /// Returns store and reconstruction errors.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RecordedEvent>>, EventStoreError> {
        if self.done {
            return Ok(None);
        }

        let take = self
            .remaining
            .map_or(self.batch_size, |r| r.min(self.batch_size));
        if take == 0 {
            self.done = true;
            return Ok(None);
        }

        let mut page_plan = self.plan.clone();
        page_plan.skip = Some(self.offset);
        page_plan.limit = Some(take);

        let records = self.store.find(&page_plan).await?;
        if records.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let fetched = records.len() as u64;
        self.offset += fetched;
        if let Some(remaining) = &mut self.remaining {
            *remaining -= fetched.min(*remaining);
        }
        if fetched < take {
            self.done = true;
        }

        let events = records
            .iter()
            .map(|record| self.registry.reconstruct(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(events))
    }

    /// Drains every remaining page into one sequence.
    ///
    /// # Errors
    ///
    /// Returns store and reconstruction errors.
    pub async fn collect_all(mut self) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let mut all = Vec::new();
        while let Some(mut page) = self.next_page().await? {
            all.append(&mut page);
        }
        Ok(all)
    }
}

impl std::fmt::Debug for RepositoryReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryReader")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchReader")
            .field("plan", &self.plan)
            .field("batch_size", &self.batch_size)
            .field("remaining", &self.remaining)
            .field("offset", &self.offset)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
