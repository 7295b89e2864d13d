//! In-memory `RecordStore` — the reference store adapter for tests.
//!
//! Enforces the same unique indexes a production store must carry, assigns
//! monotonic insertion timestamps, and keeps a private insertion sequence as
//! the identity tiebreak.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use everstream_core::clock::{Clock, SystemClock};
use everstream_core::error::{RecordStoreError, UniqueIndex};
use everstream_core::record::{NewRecord, StoredRecord};
use everstream_core::specification::Direction;
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore, SortField};

#[derive(Debug, Clone)]
struct Row {
    // Private insertion identity; never exposed on records.
    seq: u64,
    record: StoredRecord,
}

#[derive(Debug, Default)]
struct Collection {
    rows: Vec<Row>,
    next_seq: u64,
    last_inserted_at: Option<DateTime<Utc>>,
}

/// An in-memory record store with batch-atomic unique-constraint checks.
pub struct MemoryRecordStore {
    collection: Mutex<Collection>,
    clock: Arc<dyn Clock>,
}

impl MemoryRecordStore {
    /// Creates a store reading time from the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a store reading time from the given clock.
    ///
    /// Equal clock readings are bumped by one microsecond so `inserted_at`
    /// stays strictly monotonic even under a fixed clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            collection: Mutex::new(Collection::default()),
            clock,
        }
    }

    /// Snapshot of every stored record, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all_records(&self) -> Vec<StoredRecord> {
        let collection = self.collection.lock().unwrap();
        collection.rows.iter().map(|r| r.record.clone()).collect()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(filter: &RecordFilter, record: &StoredRecord) -> bool {
    if let Some(stream) = &filter.stream
        && record.stream != *stream
    {
        return false;
    }
    if let Some(ids) = &filter.event_ids
        && !ids.contains(&record.event_id)
    {
        return false;
    }
    if let Some(types) = &filter.event_types
        && !types.contains(&record.event_type)
    {
        return false;
    }
    if let Some(above) = filter.position_above
        && record.position.is_none_or(|p| p <= above)
    {
        return false;
    }
    if let Some(below) = filter.position_below
        && record.position.is_none_or(|p| p >= below)
    {
        return false;
    }
    if let Some(after) = filter.inserted_after
        && record.inserted_at <= after
    {
        return false;
    }
    if let Some(before) = filter.inserted_before
        && record.inserted_at >= before
    {
        return false;
    }
    true
}

fn compare(sort: &[(SortField, Direction)], a: &Row, b: &Row) -> Ordering {
    for (field, direction) in sort {
        let ordering = match field {
            // Option ordering puts position-less records first ascending.
            SortField::Position => a.record.position.cmp(&b.record.position),
            SortField::InsertedAt => a.record.inserted_at.cmp(&b.record.inserted_at),
            SortField::Identity => a.seq.cmp(&b.seq),
        };
        let ordering = match direction {
            Direction::Forward => ordering,
            Direction::Backward => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn violated_index(existing: &[Row], batch: &[NewRecord], candidate: &NewRecord) -> Option<UniqueIndex> {
    let stream_position_taken = |stream: &str, position: i64| {
        existing
            .iter()
            .any(|r| r.record.stream == stream && r.record.position == Some(position))
            || batch
                .iter()
                .any(|r| r.stream == stream && r.position == Some(position))
    };
    let stream_id_taken = |stream: &str, event_id: &str| {
        existing
            .iter()
            .any(|r| r.record.stream == stream && r.record.event_id == event_id)
            || batch
                .iter()
                .any(|r| r.stream == stream && r.event_id == event_id)
    };

    if let Some(position) = candidate.position
        && stream_position_taken(&candidate.stream, position)
    {
        return Some(UniqueIndex::StreamPosition);
    }
    if stream_id_taken(&candidate.stream, &candidate.event_id) {
        return Some(UniqueIndex::StreamEventId);
    }
    None
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<(), RecordStoreError> {
        let mut collection = self
            .collection
            .lock()
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        // Validate the whole batch before committing any of it.
        let mut accepted: Vec<NewRecord> = Vec::with_capacity(records.len());
        for record in records {
            if let Some(index) = violated_index(&collection.rows, &accepted, &record) {
                return Err(RecordStoreError::UniqueViolation { index });
            }
            accepted.push(record);
        }

        for record in accepted {
            let mut now = self.clock.now();
            if let Some(last) = collection.last_inserted_at
                && now <= last
            {
                now = last + Duration::microseconds(1);
            }
            collection.last_inserted_at = Some(now);

            let seq = collection.next_seq;
            collection.next_seq += 1;
            collection.rows.push(Row {
                seq,
                record: StoredRecord {
                    stream: record.stream,
                    event_id: record.event_id,
                    event_type: record.event_type,
                    data: record.data,
                    metadata: record.metadata,
                    position: record.position,
                    inserted_at: now,
                },
            });
        }
        Ok(())
    }

    async fn find(&self, plan: &QueryPlan) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let collection = self
            .collection
            .lock()
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        let mut rows: Vec<Row> = collection
            .rows
            .iter()
            .filter(|r| matches(&plan.filter, &r.record))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare(&plan.sort, a, b));

        let skip = usize::try_from(plan.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let mut result: Vec<StoredRecord> =
            rows.into_iter().skip(skip).map(|r| r.record).collect();
        if let Some(limit) = plan.limit {
            result.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(result)
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64, RecordStoreError> {
        let collection = self
            .collection
            .lock()
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        let matched = collection
            .rows
            .iter()
            .filter(|r| matches(&plan.filter, &r.record))
            .count() as u64;
        Ok(plan.limit.map_or(matched, |limit| matched.min(limit)))
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, RecordStoreError> {
        let mut collection = self
            .collection
            .lock()
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        let before = collection.rows.len();
        collection.rows.retain(|r| !matches(filter, &r.record));
        Ok((before - collection.rows.len()) as u64)
    }

    async fn update_event(
        &self,
        event_id: &str,
        event_type: &str,
        data: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<u64, RecordStoreError> {
        let mut collection = self
            .collection
            .lock()
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        let mut rewritten = 0;
        for row in collection
            .rows
            .iter_mut()
            .filter(|r| r.record.event_id == event_id)
        {
            row.record.event_type = event_type.to_owned();
            row.record.data = data.clone();
            row.record.metadata = metadata.clone();
            rewritten += 1;
        }
        Ok(rewritten)
    }
}

impl std::fmt::Debug for MemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(stream: &str, event_id: &str, position: Option<i64>) -> NewRecord {
        NewRecord {
            stream: stream.to_owned(),
            event_id: event_id.to_owned(),
            event_type: "test.event".to_owned(),
            data: serde_json::json!({}),
            metadata: serde_json::json!({}),
            position,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_monotonic_timestamps_under_fixed_clock() {
        let fixed = chrono::Utc::now();
        let store = MemoryRecordStore::with_clock(Arc::new(crate::FixedClock(fixed)));

        store
            .insert_many(vec![
                new_record("s", "e1", Some(1)),
                new_record("s", "e2", Some(2)),
            ])
            .await
            .unwrap();

        let records = store.all_records();
        assert_eq!(records.len(), 2);
        assert!(records[0].inserted_at < records[1].inserted_at);
    }

    #[tokio::test]
    async fn test_duplicate_stream_position_is_rejected_batch_atomically() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(vec![new_record("s", "e1", Some(1))])
            .await
            .unwrap();

        let result = store
            .insert_many(vec![
                new_record("s", "e2", Some(2)),
                new_record("s", "e3", Some(1)),
            ])
            .await;

        assert!(matches!(
            result,
            Err(RecordStoreError::UniqueViolation {
                index: UniqueIndex::StreamPosition
            })
        ));
        // Nothing from the failed batch was committed.
        assert_eq!(store.all_records().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_stream_event_id_is_rejected() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(vec![new_record("s", "e1", Some(1))])
            .await
            .unwrap();

        let result = store.insert_many(vec![new_record("s", "e1", Some(2))]).await;

        assert!(matches!(
            result,
            Err(RecordStoreError::UniqueViolation {
                index: UniqueIndex::StreamEventId
            })
        ));
    }

    #[tokio::test]
    async fn test_same_event_id_in_two_streams_is_allowed() {
        let store = MemoryRecordStore::new();

        store
            .insert_many(vec![new_record("a", "e1", Some(1))])
            .await
            .unwrap();
        store
            .insert_many(vec![new_record("b", "e1", Some(1))])
            .await
            .unwrap();

        assert_eq!(store.all_records().len(), 2);
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(vec![
                new_record("s", "e1", Some(1)),
                new_record("s", "e2", Some(2)),
                new_record("s", "e3", Some(3)),
            ])
            .await
            .unwrap();

        let plan = QueryPlan::filtered(RecordFilter::stream("s"))
            .sorted_by(SortField::Position, Direction::Backward)
            .sorted_by(SortField::Identity, Direction::Backward);
        let mut paged = plan.clone();
        paged.skip = Some(1);
        paged.limit = Some(1);

        let all = store.find(&plan).await.unwrap();
        let page = store.find(&paged).await.unwrap();

        let ids: Vec<&str> = all.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e2", "e1"]);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].event_id, "e2");
    }

    #[tokio::test]
    async fn test_count_honors_limit() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(vec![
                new_record("s", "e1", Some(1)),
                new_record("s", "e2", Some(2)),
            ])
            .await
            .unwrap();

        let plan = QueryPlan::filtered(RecordFilter::stream("s"));
        assert_eq!(store.count(&plan).await.unwrap(), 2);
        assert_eq!(store.count(&plan.clone().limit(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_event_rewrites_every_copy() {
        let store = MemoryRecordStore::new();
        store
            .insert_many(vec![
                new_record("a", "e1", Some(1)),
                new_record("b", "e1", Some(1)),
            ])
            .await
            .unwrap();

        let rewritten = store
            .update_event(
                "e1",
                "test.renamed",
                &serde_json::json!({"v": 2}),
                &serde_json::json!({"rev": 2}),
            )
            .await
            .unwrap();

        assert_eq!(rewritten, 2);
        for record in store.all_records() {
            assert_eq!(record.event_type, "test.renamed");
            assert_eq!(record.data, serde_json::json!({"v": 2}));
        }
    }
}
