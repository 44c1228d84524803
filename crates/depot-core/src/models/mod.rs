pub mod chunk_session;
pub mod file;
pub mod transfer;
pub mod user;
pub mod user_file;

pub use chunk_session::ChunkSession;
pub use file::{FileStatus, StoredFile};
pub use transfer::{TransferMessage, TransferStatus, TransferTask};
pub use user::UserAccount;
pub use user_file::{LinkOutcome, UnlinkOutcome, UserFileLink};
