//! The stream repository — append, link, delete, update, and scoped reads.

use std::sync::Arc;

use everstream_core::error::EventStoreError;
use everstream_core::event::RecordedEvent;
use everstream_core::record::{EventRecord, StoredRecord};
use everstream_core::registry::EventTypeRegistry;
use everstream_core::specification::Specification;
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore};
use everstream_core::stream::{GLOBAL_STREAM_NAME, Stream};
use everstream_core::version::ExpectedVersion;

use crate::reader::{BatchReader, RepositoryReader};
use crate::writer::add_to_stream;

/// Append-only event log over a [`RecordStore`] adapter.
///
/// Appends mirror every event into the synthetic global feed; reads go
/// through the read-scope builder so that forward/backward, bounded and
/// batched reads behave identically regardless of physical storage order.
#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn RecordStore>,
    reader: RepositoryReader,
}

impl EventRepository {
    /// Creates a repository over the given store, reconstructing events
    /// through the given registry.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, registry: Arc<EventTypeRegistry>) -> Self {
        let reader = RepositoryReader::new(Arc::clone(&store), registry);
        Self { store, reader }
    }

    /// The reader half of this repository.
    #[must_use]
    pub fn reader(&self) -> &RepositoryReader {
        &self.reader
    }

    /// Appends serialized events to a stream under an expected-version hint.
    ///
    /// The whole batch is validated before the store receives one bulk
    /// insert; each event that is new to the log also gets a mirror record in
    /// the global feed.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::ReservedInternalName`] when the target is
    /// the reserved feed name, [`EventStoreError::WrongExpectedVersion`] on a
    /// version conflict and [`EventStoreError::EventDuplicatedInStream`] when
    /// an event id is already present in the target stream.
    pub async fn append_to_stream(
        &self,
        events: Vec<EventRecord>,
        stream: &Stream,
        expected_version: ExpectedVersion,
    ) -> Result<(), EventStoreError> {
        tracing::debug!(stream = %stream, count = events.len(), "appending events");
        add_to_stream(self.store.as_ref(), events, stream, expected_version, false).await
    }

    /// Attaches already-stored events, by id, to an additional stream.
    ///
    /// No new global-feed mirrors are created; the events already have one.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::EventNotFound`] naming the first id that
    /// resolves to no stored event, plus everything `append_to_stream` may
    /// return.
    pub async fn link_to_stream(
        &self,
        event_ids: &[String],
        stream: &Stream,
        expected_version: ExpectedVersion,
    ) -> Result<(), EventStoreError> {
        tracing::debug!(stream = %stream, count = event_ids.len(), "linking events");
        let mut resolved = Vec::with_capacity(event_ids.len());
        for event_id in event_ids {
            let record = self
                .find_by_event_id(event_id)
                .await?
                .ok_or_else(|| EventStoreError::EventNotFound(event_id.clone()))?;
            resolved.push(record.to_event_record());
        }
        add_to_stream(self.store.as_ref(), resolved, stream, expected_version, true).await
    }

    /// Deletes every record of the given stream; a no-op when the stream has
    /// none. Other streams' copies of the same event ids are untouched, as
    /// are the global feed's mirrors.
    ///
    /// # Errors
    ///
    /// Returns store-layer errors unwrapped.
    pub async fn delete_stream(&self, stream: &Stream) -> Result<u64, EventStoreError> {
        let removed = self
            .store
            .delete_many(&RecordFilter::stream(stream.serialized_name()))
            .await?;
        tracing::debug!(stream = %stream, removed, "deleted stream");
        Ok(removed)
    }

    /// Rewrites `data`, `metadata` and `event_type` in place for every stored
    /// copy of each given event, across all streams. Ordering fields are
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::EventNotFound`] before any mutation when an
    /// event id is absent from the store.
    pub async fn update_messages(&self, events: &[EventRecord]) -> Result<(), EventStoreError> {
        // Collect missing ids up front so a partial batch never mutates.
        for event in events {
            if !self.has_event(&event.event_id).await? {
                return Err(EventStoreError::EventNotFound(event.event_id.clone()));
            }
        }
        for event in events {
            self.store
                .update_event(&event.event_id, &event.event_type, &event.data, &event.metadata)
                .await?;
        }
        tracing::debug!(count = events.len(), "updated events in place");
        Ok(())
    }

    /// Whether any stored record carries the given event id.
    ///
    /// # Errors
    ///
    /// Returns store-layer errors unwrapped.
    pub async fn has_event(&self, event_id: &str) -> Result<bool, EventStoreError> {
        let plan = QueryPlan::filtered(RecordFilter::event_id(event_id));
        Ok(self.store.count(&plan).await? > 0)
    }

    /// The named streams an event id appears in; the global feed is excluded.
    ///
    /// # Errors
    ///
    /// Returns store-layer errors unwrapped.
    pub async fn streams_of(&self, event_id: &str) -> Result<Vec<Stream>, EventStoreError> {
        let plan = QueryPlan::filtered(RecordFilter::event_id(event_id));
        let records = self.store.find(&plan).await?;
        Ok(records
            .into_iter()
            .filter(|record| record.stream != GLOBAL_STREAM_NAME)
            .map(|record| Stream::Named(record.stream))
            .collect())
    }

    /// The newest event of a stream, or `None` when it has no records.
    ///
    /// # Errors
    ///
    /// Returns store and reconstruction errors.
    pub async fn last_stream_event(
        &self,
        stream: &Stream,
    ) -> Result<Option<RecordedEvent>, EventStoreError> {
        self.reader.last_stream_event(stream).await
    }

    /// Reads every record a specification matches. See
    /// [`RepositoryReader::read`].
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read(&self, spec: &Specification) -> Result<Vec<RecordedEvent>, EventStoreError> {
        self.reader.read(spec).await
    }

    /// Counts the records a specification matches. See
    /// [`RepositoryReader::count`].
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::count`].
    pub async fn count(&self, spec: &Specification) -> Result<u64, EventStoreError> {
        self.reader.count(spec).await
    }

    /// Opens a batched read. See [`RepositoryReader::read_in_batches`].
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read_in_batches`].
    pub async fn read_in_batches(
        &self,
        spec: &Specification,
    ) -> Result<BatchReader, EventStoreError> {
        self.reader.read_in_batches(spec).await
    }

    /// Full stream, oldest first.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_stream_events_forward(
        &self,
        stream_name: &str,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        self.read(&Specification::stream(stream_name)).await
    }

    /// Full stream, newest first.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_stream_events_backward(
        &self,
        stream_name: &str,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        self.read(&Specification::stream(stream_name).backward())
            .await
    }

    /// Up to `count` stream events past `start` (exclusive), oldest first.
    /// `None` starts from the head of the stream.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_events_forward(
        &self,
        stream_name: &str,
        start: Option<&str>,
        count: u64,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let mut spec = Specification::stream(stream_name).limit(count);
        if let Some(start) = start {
            spec = spec.from(start);
        }
        self.read(&spec).await
    }

    /// Up to `count` stream events past `start` (exclusive), newest first.
    /// `None` starts from the tail of the stream.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_events_backward(
        &self,
        stream_name: &str,
        start: Option<&str>,
        count: u64,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let mut spec = Specification::stream(stream_name).backward().limit(count);
        if let Some(start) = start {
            spec = spec.from(start);
        }
        self.read(&spec).await
    }

    /// Up to `count` global-feed events past `start` (exclusive), oldest
    /// first.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_all_streams_forward(
        &self,
        start: Option<&str>,
        count: u64,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let mut spec = Specification::global().limit(count);
        if let Some(start) = start {
            spec = spec.from(start);
        }
        self.read(&spec).await
    }

    /// Up to `count` global-feed events past `start` (exclusive), newest
    /// first.
    ///
    /// # Errors
    ///
    /// See [`RepositoryReader::read`].
    pub async fn read_all_streams_backward(
        &self,
        start: Option<&str>,
        count: u64,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let mut spec = Specification::global().backward().limit(count);
        if let Some(start) = start {
            spec = spec.from(start);
        }
        self.read(&spec).await
    }

    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<StoredRecord>, EventStoreError> {
        let plan = QueryPlan::filtered(RecordFilter::event_id(event_id));
        Ok(self.store.find_one(&plan).await?)
    }
}

impl std::fmt::Debug for EventRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRepository")
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}
