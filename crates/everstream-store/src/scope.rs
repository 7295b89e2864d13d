//! Read-scope builder — turns a specification into a concrete query plan.

use everstream_core::error::EventStoreError;
use everstream_core::record::StoredRecord;
use everstream_core::specification::{Direction, Specification};
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore, SortField};
use everstream_core::stream::{GLOBAL_STREAM_NAME, Stream};

/// Rejects the reserved global-feed name used as an explicit stream selector.
///
/// The global feed is reachable only through [`Stream::Global`].
pub(crate) fn ensure_not_reserved(stream: &Stream) -> Result<(), EventStoreError> {
    if let Stream::Named(name) = stream
        && name == GLOBAL_STREAM_NAME
    {
        return Err(EventStoreError::ReservedInternalName(name.clone()));
    }
    Ok(())
}

/// Which end of the window a bound closes.
#[derive(Debug, Clone, Copy)]
enum BoundKind {
    /// Excludes everything at or before the bounding record in the requested
    /// direction.
    Start,
    /// Excludes everything at or after the bounding record.
    Stop,
}

/// Builds the ordered, bounded query plan for a specification.
///
/// Named streams order by `position`, the global feed by `inserted_at`; both
/// tiebreak on the store's record identity in the requested direction.
/// `start`/`stop` bounds are exclusive of the named event itself and are
/// resolved against the bounding event's record within the same stream scope.
pub(crate) async fn build_scope(
    store: &dyn RecordStore,
    spec: &Specification,
) -> Result<QueryPlan, EventStoreError> {
    ensure_not_reserved(&spec.stream)?;

    let serialized = spec.stream.serialized_name();
    let mut filter = RecordFilter::stream(serialized);
    filter.event_ids = spec.with_ids.clone();
    filter.event_types = spec.with_types.clone();

    if let Some(start) = &spec.start {
        let bounding = bounding_record(store, serialized, start).await?;
        apply_bound(&mut filter, &spec.stream, spec.direction, &bounding, BoundKind::Start);
    }
    if let Some(stop) = &spec.stop {
        let bounding = bounding_record(store, serialized, stop).await?;
        apply_bound(&mut filter, &spec.stream, spec.direction, &bounding, BoundKind::Stop);
    }

    let order_field = if spec.stream.is_global() {
        SortField::InsertedAt
    } else {
        SortField::Position
    };
    let mut plan = QueryPlan::filtered(filter)
        .sorted_by(order_field, spec.direction)
        .sorted_by(SortField::Identity, spec.direction);
    if let Some(limit) = spec.limit {
        plan = plan.limit(limit);
    }
    Ok(plan)
}

/// Looks up a bound's own record within the stream scope being read.
async fn bounding_record(
    store: &dyn RecordStore,
    serialized_stream: &str,
    event_id: &str,
) -> Result<StoredRecord, EventStoreError> {
    let mut filter = RecordFilter::stream(serialized_stream);
    filter.event_ids = Some(vec![event_id.to_owned()]);

    store
        .find_one(&QueryPlan::filtered(filter))
        .await?
        .ok_or_else(|| EventStoreError::EventNotFound(event_id.to_owned()))
}

fn apply_bound(
    filter: &mut RecordFilter,
    stream: &Stream,
    direction: Direction,
    bounding: &StoredRecord,
    kind: BoundKind,
) {
    // A start bound excludes the past of the bounding record, a stop bound
    // its future; "past" flips with the read direction.
    let keep_above = match (kind, direction) {
        (BoundKind::Start, Direction::Forward) | (BoundKind::Stop, Direction::Backward) => true,
        (BoundKind::Start, Direction::Backward) | (BoundKind::Stop, Direction::Forward) => false,
    };

    // Named streams compare on position; the global feed (and any record
    // written without positional ordering) compares on insertion time.
    match (stream.is_global(), bounding.position) {
        (false, Some(position)) => {
            if keep_above {
                filter.position_above = Some(position);
            } else {
                filter.position_below = Some(position);
            }
        }
        _ => {
            if keep_above {
                filter.inserted_after = Some(bounding.inserted_at);
            } else {
                filter.inserted_before = Some(bounding.inserted_at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_name_is_rejected_as_named_stream() {
        let result = ensure_not_reserved(&Stream::named(GLOBAL_STREAM_NAME));
        assert!(matches!(
            result,
            Err(EventStoreError::ReservedInternalName(name)) if name == GLOBAL_STREAM_NAME
        ));
    }

    #[test]
    fn test_global_selector_is_not_reserved() {
        assert!(ensure_not_reserved(&Stream::Global).is_ok());
        assert!(ensure_not_reserved(&Stream::named("orders")).is_ok());
    }
}
