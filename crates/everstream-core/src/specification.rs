//! Read specifications — the declarative shape of a read.

use crate::stream::Stream;

/// Requested read direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Oldest first.
    #[default]
    Forward,
    /// Newest first.
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Declarative description of a read: stream selector, direction, exclusive
/// id bounds, id/type filters, limit and batch size.
///
/// Built with chained methods and handed to the repository's read operations.
#[derive(Debug, Clone)]
pub struct Specification {
    /// Stream the read targets.
    pub stream: Stream,
    /// Read direction.
    pub direction: Direction,
    /// Exclusive lower bound: the id of the event to read past.
    pub start: Option<String>,
    /// Exclusive upper bound: the id of the event to stop before.
    pub stop: Option<String>,
    /// Restrict to these event ids.
    pub with_ids: Option<Vec<String>>,
    /// Restrict to these event type tags.
    pub with_types: Option<Vec<String>>,
    /// Truncate the ordered result to this many records.
    pub limit: Option<u64>,
    /// Page size for batched reads.
    pub batch_size: Option<u64>,
}

impl Specification {
    /// A forward, unbounded read of a named stream.
    #[must_use]
    pub fn stream(name: impl Into<String>) -> Self {
        Self::for_stream(Stream::Named(name.into()))
    }

    /// A forward, unbounded read of the global feed.
    #[must_use]
    pub fn global() -> Self {
        Self::for_stream(Stream::Global)
    }

    fn for_stream(stream: Stream) -> Self {
        Self {
            stream,
            direction: Direction::Forward,
            start: None,
            stop: None,
            with_ids: None,
            with_types: None,
            limit: None,
            batch_size: None,
        }
    }

    /// Reads oldest first.
    #[must_use]
    pub fn forward(mut self) -> Self {
        self.direction = Direction::Forward;
        self
    }

    /// Reads newest first.
    #[must_use]
    pub fn backward(mut self) -> Self {
        self.direction = Direction::Backward;
        self
    }

    /// Starts past the given event (exclusive).
    #[must_use]
    pub fn from(mut self, event_id: impl Into<String>) -> Self {
        self.start = Some(event_id.into());
        self
    }

    /// Stops before the given event (exclusive).
    #[must_use]
    pub fn to(mut self, event_id: impl Into<String>) -> Self {
        self.stop = Some(event_id.into());
        self
    }

    /// Restricts the read to the given event ids.
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.with_ids = Some(ids);
        self
    }

    /// Restricts the read to the given event type tags.
    #[must_use]
    pub fn of_types(mut self, types: Vec<String>) -> Self {
        self.with_types = Some(types);
        self
    }

    /// Truncates the ordered result to `limit` records.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reads in pages of `batch_size` records.
    #[must_use]
    pub fn in_batches(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}
