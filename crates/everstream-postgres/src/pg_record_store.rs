//! PostgreSQL implementation of the `RecordStore` trait.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use everstream_core::error::{RecordStoreError, UniqueIndex};
use everstream_core::record::{NewRecord, StoredRecord};
use everstream_core::specification::Direction;
use everstream_core::store::{QueryPlan, RecordFilter, RecordStore, SortField};

use crate::schema::{CREATE_EVENT_RECORDS_TABLE, STREAM_EVENT_ID_INDEX, STREAM_POSITION_INDEX};

const SELECT_COLUMNS: &str =
    r#"SELECT stream, event_id, event_type, data, metadata, "position", inserted_at FROM event_records"#;

/// PostgreSQL-backed record store.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a fresh pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the connection cannot be established.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, RecordStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self::new(pool))
    }

    /// Creates the event records table and its indexes if absent.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), RecordStoreError> {
        sqlx::raw_sql(CREATE_EVENT_RECORDS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

fn backend(error: sqlx::Error) -> RecordStoreError {
    RecordStoreError::Backend(error.to_string())
}

fn map_write_error(error: sqlx::Error) -> RecordStoreError {
    if let sqlx::Error::Database(db) = &error {
        match db.constraint() {
            Some(STREAM_POSITION_INDEX) => {
                return RecordStoreError::UniqueViolation {
                    index: UniqueIndex::StreamPosition,
                };
            }
            Some(STREAM_EVENT_ID_INDEX) => {
                return RecordStoreError::UniqueViolation {
                    index: UniqueIndex::StreamEventId,
                };
            }
            _ => {}
        }
    }
    backend(error)
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    builder.push(" WHERE TRUE");
    if let Some(stream) = &filter.stream {
        builder.push(" AND stream = ").push_bind(stream.clone());
    }
    if let Some(ids) = &filter.event_ids {
        builder
            .push(" AND event_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
    if let Some(types) = &filter.event_types {
        builder
            .push(" AND event_type = ANY(")
            .push_bind(types.clone())
            .push(")");
    }
    if let Some(above) = filter.position_above {
        builder.push(r#" AND "position" > "#).push_bind(above);
    }
    if let Some(below) = filter.position_below {
        builder.push(r#" AND "position" < "#).push_bind(below);
    }
    if let Some(after) = filter.inserted_after {
        builder.push(" AND inserted_at > ").push_bind(after);
    }
    if let Some(before) = filter.inserted_before {
        builder.push(" AND inserted_at < ").push_bind(before);
    }
}

// NULLS FIRST ascending (and LAST descending) so that position-less records
// sort the same way the repository's plan semantics expect: absent positions
// compare below every present one.
fn order_term(field: SortField, direction: Direction) -> &'static str {
    match (field, direction) {
        (SortField::Position, Direction::Forward) => r#""position" ASC NULLS FIRST"#,
        (SortField::Position, Direction::Backward) => r#""position" DESC NULLS LAST"#,
        (SortField::InsertedAt, Direction::Forward) => "inserted_at ASC",
        (SortField::InsertedAt, Direction::Backward) => "inserted_at DESC",
        (SortField::Identity, Direction::Forward) => "id ASC",
        (SortField::Identity, Direction::Backward) => "id DESC",
    }
}

fn push_plan_tail(builder: &mut QueryBuilder<'_, Postgres>, plan: &QueryPlan) {
    if !plan.sort.is_empty() {
        builder.push(" ORDER BY ");
        for (i, (field, direction)) in plan.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(order_term(*field, *direction));
        }
    }
    if let Some(limit) = plan.limit {
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if let Some(skip) = plan.skip {
        builder
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));
    }
}

fn select_plan(plan: &QueryPlan) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(SELECT_COLUMNS);
    push_filter(&mut builder, &plan.filter);
    push_plan_tail(&mut builder, plan);
    builder
}

fn row_to_record(row: &PgRow) -> Result<StoredRecord, sqlx::Error> {
    Ok(StoredRecord {
        stream: row.try_get("stream")?,
        event_id: row.try_get("event_id")?,
        event_type: row.try_get("event_type")?,
        data: row.try_get("data")?,
        metadata: row.try_get("metadata")?,
        position: row.try_get("position")?,
        inserted_at: row.try_get("inserted_at")?,
    })
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<(), RecordStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            r#"INSERT INTO event_records (stream, event_id, event_type, data, metadata, "position") "#,
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.stream)
                .push_bind(record.event_id)
                .push_bind(record.event_type)
                .push_bind(record.data)
                .push_bind(record.metadata)
                .push_bind(record.position);
        });

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn find(&self, plan: &QueryPlan) -> Result<Vec<StoredRecord>, RecordStoreError> {
        let mut builder = select_plan(plan);
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter()
            .map(|row| row_to_record(row).map_err(backend))
            .collect()
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64, RecordStoreError> {
        // Wrap the scoped select so a plan limit caps the count as well.
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (SELECT 1 FROM event_records");
        push_filter(&mut builder, &plan.filter);
        if let Some(limit) = plan.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        builder.push(") AS scoped");

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get(0).map_err(backend)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_many(&self, filter: &RecordFilter) -> Result<u64, RecordStoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM event_records");
        push_filter(&mut builder, filter);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn update_event(
        &self,
        event_id: &str,
        event_type: &str,
        data: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<u64, RecordStoreError> {
        let result = sqlx::query(
            "UPDATE event_records SET event_type = $1, data = $2, metadata = $3 WHERE event_id = $4",
        )
        .bind(event_type)
        .bind(data)
        .bind(metadata)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }
}
