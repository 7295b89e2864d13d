//! PostgreSQL record-store adapter for the Everstream event log.

mod pg_record_store;
pub mod schema;

pub use pg_record_store::PgRecordStore;
