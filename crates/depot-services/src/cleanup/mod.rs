pub mod pool;
pub mod service;

pub use pool::DeletionPool;
pub use service::CleanupService;
