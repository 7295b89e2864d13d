//! Expected versions and position arithmetic.

use crate::error::EventStoreError;

/// Offset between 0-based expected versions and stored positions.
///
/// The first event of a stream is stored at this position.
pub const POSITION_SHIFT: i64 = 1;

/// Caller's assertion about the current stream tail before an append.
///
/// Versions are 0-based: a stream holding one event (at position
/// [`POSITION_SHIFT`]) is at version 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The stream must not yet have any events.
    None,
    /// Continue after whatever the current tail is.
    Auto,
    /// No positional ordering at all; only identity uniqueness is enforced.
    Any,
    /// The stream tail must be at exactly this version.
    Exact(i64),
}

impl ExpectedVersion {
    /// Resolves this hint against the stream's current tail position into the
    /// base position a batch continues from, or `None` when positional
    /// ordering is not enforced.
    ///
    /// A batch of `n` records appended on base `b` occupies positions
    /// `b + 1 ..= b + n` (see [`position_for`]).
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::WrongExpectedVersion`] when `None` is used
    /// on a non-empty stream or `Exact` does not match the tail.
    pub fn resolve(
        self,
        tail_position: Option<i64>,
        stream: &str,
    ) -> Result<Option<i64>, EventStoreError> {
        match self {
            Self::Any => Ok(None),
            Self::Auto => Ok(Some(tail_position.unwrap_or(0))),
            Self::None => {
                if tail_position.is_some() {
                    return Err(EventStoreError::WrongExpectedVersion {
                        stream: stream.to_owned(),
                    });
                }
                Ok(Some(0))
            }
            Self::Exact(version) => {
                let expected_tail = version + POSITION_SHIFT;
                if tail_position != Some(expected_tail) {
                    return Err(EventStoreError::WrongExpectedVersion {
                        stream: stream.to_owned(),
                    });
                }
                Ok(Some(expected_tail))
            }
        }
    }
}

/// Position of the `index`-th record of a batch continuing from `base`.
#[must_use]
pub fn position_for(base: Option<i64>, index: usize) -> Option<i64> {
    let offset = i64::try_from(index).ok()?;
    base.map(|b| b + offset + 1)
}
