//! Depot Worker Library
//!
//! The transfer pipeline consumer: a long-lived worker that drains the
//! durable transfer queue and pushes local files to the remote object store.

pub mod transfer;

pub use transfer::{TransferWorker, TransferWorkerConfig};
