use depot_core::models::LinkOutcome;
use uuid::Uuid;

/// Result of an accepted upload (single-shot or merged).
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub file_id: Uuid,
    /// `Linked` for a new link, `Repeat` when the user already owned the
    /// content. Both are success variants.
    pub outcome: LinkOutcome,
    /// True when the content hash was already known and the freshly-written
    /// local bytes were discarded in favor of the existing canonical copy.
    pub deduplicated: bool,
}

/// Result of a hash-only fast upload probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastUploadOutcome {
    /// Content unknown: the client must upload the bytes.
    NotExists,
    /// The user already owns this content.
    Repeat { file_id: Uuid },
    /// Linked to existing content without transferring bytes.
    Linked { file_id: Uuid },
}

/// Progress snapshot returned after a chunk is accepted.
#[derive(Debug, Clone)]
pub struct ChunkReceipt {
    pub upload_id: String,
    pub chunk_index: i32,
    pub received_chunks: i32,
    pub total_chunks: i32,
}
