//! Stream selectors.

use std::fmt;

/// Reserved name under which global-feed records are persisted.
///
/// Callers never use this name directly: the global feed is selected with
/// [`Stream::Global`], and naming the feed by this literal in a read or count
/// is rejected with [`crate::error::EventStoreError::ReservedInternalName`].
pub const GLOBAL_STREAM_NAME: &str = "all";

/// Selector for the stream a repository operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stream {
    /// The synthetic global feed mirroring every appended event.
    Global,
    /// A named stream.
    Named(String),
}

impl Stream {
    /// Creates a named stream selector.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns true for the global-feed selector.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// The stream name as persisted on records.
    ///
    /// The global feed serializes to [`GLOBAL_STREAM_NAME`].
    #[must_use]
    pub fn serialized_name(&self) -> &str {
        match self {
            Self::Global => GLOBAL_STREAM_NAME,
            Self::Named(name) => name,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serialized_name())
    }
}
