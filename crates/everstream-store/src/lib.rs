//! Everstream Store — the stream repository.
//!
//! Persists immutable domain events into named streams and the synthetic
//! global feed, enforces per-stream append ordering via optimistic
//! concurrency, and serves ordered, optionally bounded and paginated reads in
//! either direction. Storage is delegated to a [`RecordStore`] adapter; the
//! repository's pre-checks are best-effort and the store's unique indexes are
//! the authoritative guard against racing writers.
//!
//! [`RecordStore`]: everstream_core::store::RecordStore

mod reader;
mod repository;
mod scope;
mod writer;

pub use reader::{BatchReader, RepositoryReader};
pub use repository::EventRepository;
