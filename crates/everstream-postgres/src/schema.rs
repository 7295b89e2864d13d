//! Record store database schema.

/// SQL to create the event records table and its unique indexes.
///
/// The two unique indexes are the authoritative concurrency guard: racing
/// appends for the same position or the same `(stream, event_id)` pair fail
/// deterministically at the store. Global-feed mirrors carry a NULL position
/// and are therefore never caught by the position index.
pub const CREATE_EVENT_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS event_records (
    id          BIGSERIAL PRIMARY KEY,
    stream      TEXT NOT NULL,
    event_id    TEXT NOT NULL,
    event_type  TEXT NOT NULL,
    data        JSONB NOT NULL,
    metadata    JSONB NOT NULL,
    "position"  BIGINT,
    inserted_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
);

CREATE UNIQUE INDEX IF NOT EXISTS event_records_stream_position_idx
    ON event_records (stream, "position");

CREATE UNIQUE INDEX IF NOT EXISTS event_records_stream_event_id_idx
    ON event_records (stream, event_id);

CREATE INDEX IF NOT EXISTS event_records_event_id_idx
    ON event_records (event_id);

CREATE INDEX IF NOT EXISTS event_records_stream_inserted_at_idx
    ON event_records (stream, inserted_at);
"#;

/// Name of the unique index backing `(stream, position)`.
pub const STREAM_POSITION_INDEX: &str = "event_records_stream_position_idx";

/// Name of the unique index backing `(stream, event_id)`.
pub const STREAM_EVENT_ID_INDEX: &str = "event_records_stream_event_id_idx";
