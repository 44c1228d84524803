//! Database repositories for the data access layer.
//!
//! Repositories own their SQL; the hash-uniqueness constraint and the
//! transaction boundaries in `files` are the only concurrency-control
//! mechanisms for deduplication and reference counting.

pub mod files;
pub mod sessions;
pub mod transfers;
pub mod users;
