//! Depot Storage Library
//!
//! Remote object store adapter: the [`RemoteStore`] trait plus S3 and local
//! filesystem backends. The adapter is a pure wrapper around put/get/delete
//! and presigned URLs; tiering policy lives in the transfer worker.
//!
//! # Object key format
//!
//! Keys follow `<prefix>/<display_name>`. Keys must not contain `..` or a
//! leading `/`; generation is centralized in the `keys` module so both
//! backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use depot_core::RemoteBackend;
pub use factory::create_remote_store;
pub use keys::object_key;
#[cfg(feature = "storage-local")]
pub use local::LocalRemoteStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3RemoteStore;
pub use traits::{RemoteStore, RemoteStoreError, RemoteStoreResult};
