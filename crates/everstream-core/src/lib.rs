//! Everstream Core — shared contracts for the event log.
//!
//! This crate defines the record model, the record-store abstraction, the
//! read specification and query plan, and the error taxonomy that the
//! repository and every store adapter depend on. It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod record;
pub mod registry;
pub mod specification;
pub mod store;
pub mod stream;
pub mod version;
