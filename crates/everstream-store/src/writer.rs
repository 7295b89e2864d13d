//! Append machinery: position resolution, duplicate detection, bulk writes.

use everstream_core::error::{EventStoreError, RecordStoreError, UniqueIndex};
use everstream_core::record::{EventRecord, NewRecord};
use everstream_core::specification::Direction;
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore, SortField};
use everstream_core::stream::{GLOBAL_STREAM_NAME, Stream};
use everstream_core::version::{ExpectedVersion, position_for};

use crate::scope::ensure_not_reserved;

/// Validates and persists one logical append (or link) as a single bulk write.
///
/// Every record of the batch is validated before the store sees any of it;
/// the store's unique indexes remain the authoritative guard under races and
/// their rejections are mapped back to the caller-visible conflict errors.
pub(crate) async fn add_to_stream(
    store: &dyn RecordStore,
    events: Vec<EventRecord>,
    stream: &Stream,
    expected_version: ExpectedVersion,
    linking: bool,
) -> Result<(), EventStoreError> {
    ensure_not_reserved(stream)?;

    let serialized = stream.serialized_name();
    let base = if stream.is_global() {
        // Global-feed records carry no position; a direct global append
        // behaves as "any" regardless of the hint.
        None
    } else {
        let tail = tail_position(store, serialized).await?;
        expected_version.resolve(tail, serialized)?
    };

    let mut batch: Vec<NewRecord> = Vec::with_capacity(events.len() * 2);
    for (index, event) in events.iter().enumerate() {
        if stream.is_global() {
            if linking {
                // The event already has its mirror; nothing to write.
                continue;
            }
            guard_duplicate(store, event, GLOBAL_STREAM_NAME).await?;
            batch.push(build_record(event, GLOBAL_STREAM_NAME, None));
            continue;
        }

        let position = position_for(base, index);
        if let Some(position) = position
            && position_occupied(store, serialized, position).await?
        {
            return Err(EventStoreError::WrongExpectedVersion {
                stream: serialized.to_owned(),
            });
        }
        guard_duplicate(store, event, serialized).await?;

        // One mirror per event id, ever: a link reuses the existing mirror,
        // and a re-append of the id into another stream must not create a
        // second one.
        if !linking && !mirrored_in_global(store, &event.event_id).await? {
            batch.push(build_record(event, GLOBAL_STREAM_NAME, None));
        }
        batch.push(build_record(event, serialized, position));
    }

    store
        .insert_many(batch)
        .await
        .map_err(|error| map_insert_rejection(error, &events, serialized))
}

/// Maximum stored position of a stream, or `None` for an empty stream.
pub(crate) async fn tail_position(
    store: &dyn RecordStore,
    serialized_stream: &str,
) -> Result<Option<i64>, EventStoreError> {
    let plan = QueryPlan::filtered(RecordFilter::stream(serialized_stream))
        .sorted_by(SortField::Position, Direction::Backward)
        .sorted_by(SortField::Identity, Direction::Backward);
    let tail = store.find_one(&plan).await?;
    Ok(tail.and_then(|record| record.position))
}

/// Whether an append of `event` into `serialized_stream` is an identity
/// conflict.
///
/// The id must not already be present in the target stream — for fresh
/// appends that includes copies that arrived via linking, for links it is the
/// "already linked here" idempotency check. Copies of the id in other streams
/// never conflict.
async fn guard_duplicate(
    store: &dyn RecordStore,
    event: &EventRecord,
    serialized_stream: &str,
) -> Result<(), EventStoreError> {
    if present_in_stream(store, serialized_stream, &event.event_id).await? {
        return Err(EventStoreError::EventDuplicatedInStream {
            event_id: event.event_id.clone(),
            stream: serialized_stream.to_owned(),
        });
    }
    Ok(())
}

async fn present_in_stream(
    store: &dyn RecordStore,
    serialized_stream: &str,
    event_id: &str,
) -> Result<bool, EventStoreError> {
    let mut filter = RecordFilter::stream(serialized_stream);
    filter.event_ids = Some(vec![event_id.to_owned()]);
    Ok(store.count(&QueryPlan::filtered(filter)).await? > 0)
}

async fn mirrored_in_global(
    store: &dyn RecordStore,
    event_id: &str,
) -> Result<bool, EventStoreError> {
    present_in_stream(store, GLOBAL_STREAM_NAME, event_id).await
}

async fn position_occupied(
    store: &dyn RecordStore,
    serialized_stream: &str,
    position: i64,
) -> Result<bool, EventStoreError> {
    let mut filter = RecordFilter::stream(serialized_stream);
    filter.position_above = Some(position - 1);
    filter.position_below = Some(position + 1);
    Ok(store.count(&QueryPlan::filtered(filter)).await? > 0)
}

fn build_record(event: &EventRecord, stream: &str, position: Option<i64>) -> NewRecord {
    NewRecord {
        stream: stream.to_owned(),
        event_id: event.event_id.clone(),
        event_type: event.event_type.clone(),
        data: event.data.clone(),
        metadata: event.metadata.clone(),
        position,
    }
}

/// Maps a store constraint rejection to the caller-visible conflict error.
///
/// The store does not report which record tripped the index, so the batch's
/// first event names the identity conflict as a best effort.
fn map_insert_rejection(
    error: RecordStoreError,
    events: &[EventRecord],
    serialized_stream: &str,
) -> EventStoreError {
    match error {
        RecordStoreError::UniqueViolation {
            index: UniqueIndex::StreamPosition,
        } => EventStoreError::WrongExpectedVersion {
            stream: serialized_stream.to_owned(),
        },
        RecordStoreError::UniqueViolation {
            index: UniqueIndex::StreamEventId,
        } => EventStoreError::EventDuplicatedInStream {
            event_id: events
                .first()
                .map(|e| e.event_id.clone())
                .unwrap_or_default(),
            stream: serialized_stream.to_owned(),
        },
        other => EventStoreError::Store(other),
    }
}
