use std::collections::BTreeSet;

/// Transient tracking record for one in-progress chunked upload.
///
/// Lives only in the session store; created on first chunk arrival and
/// discarded once the merge succeeds (or the cleanup sweep reclaims it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSession {
    /// Client-supplied upload identifier.
    pub upload_id: String,
    pub file_name: String,
    pub total_chunks: i32,
    /// Indices received so far. Set semantics make repeated uploads of the
    /// same chunk harmless.
    pub received: BTreeSet<i32>,
}

impl ChunkSession {
    pub fn new(upload_id: impl Into<String>, file_name: impl Into<String>, total_chunks: i32) -> Self {
        Self {
            upload_id: upload_id.into(),
            file_name: file_name.into(),
            total_chunks,
            received: BTreeSet::new(),
        }
    }

    pub fn received_count(&self) -> i32 {
        self.received.len() as i32
    }

    /// Merge may only be attempted when every declared index has arrived.
    pub fn is_complete(&self) -> bool {
        self.received_count() == self.total_chunks
    }

    /// Lowest declared index that has not arrived yet.
    pub fn first_missing(&self) -> Option<i32> {
        (0..self.total_chunks).find(|i| !self.received.contains(i))
    }
}
