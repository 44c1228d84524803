pub mod chunk_upload;
pub mod fast_upload;
pub mod file_delete;
pub mod file_download;
pub mod file_get;
pub mod file_update;
pub mod health;
pub mod merge;
pub mod upload;
pub mod user_files;
pub mod users;

use depot_core::models::{FileStatus, LinkOutcome};

/// Wire label for a link outcome. Both values are success variants.
pub(crate) fn outcome_label(outcome: LinkOutcome) -> &'static str {
    match outcome {
        LinkOutcome::Linked => "linked",
        LinkOutcome::Repeat => "repeat",
    }
}

pub(crate) fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "pending",
        FileStatus::Active => "active",
        FileStatus::Archived => "archived",
        FileStatus::Deleted => "deleted",
    }
}
