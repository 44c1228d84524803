//! End-to-end service tests over in-memory fakes: deduplication, reference
//! counting, chunk merge, and transfer publication.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use depot_core::hash;
use depot_core::models::{
    FileStatus, LinkOutcome, StoredFile, TransferMessage, UnlinkOutcome,
};
use depot_core::{AppError, FileIndex, TransferProducer};
use depot_services::{DeletionPool, FastUploadOutcome, UploadService};
use depot_session::{InMemorySessionStore, SessionStore};
use depot_storage::{LocalRemoteStore, RemoteStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

#[derive(Default)]
struct MemoryFileIndex {
    files: Mutex<HashMap<Uuid, StoredFile>>,
    links: Mutex<HashSet<(Uuid, Uuid)>>,
}

impl MemoryFileIndex {
    fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    fn by_hash(&self, content_hash: &str) -> Option<StoredFile> {
        self.files
            .lock()
            .unwrap()
            .values()
            .find(|f| f.content_hash == content_hash)
            .cloned()
    }
}

#[async_trait]
impl FileIndex for MemoryFileIndex {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoredFile>, AppError> {
        Ok(self.by_hash(content_hash))
    }

    async fn register_content(
        &self,
        content_hash: &str,
        display_name: &str,
        size_bytes: i64,
        storage_path: &str,
    ) -> Result<(StoredFile, bool), AppError> {
        let mut files = self.files.lock().unwrap();

        if let Some(existing) = files
            .values_mut()
            .find(|f| f.content_hash == content_hash)
        {
            if existing.status != FileStatus::Deleted {
                return Ok((existing.clone(), false));
            }
            existing.status = FileStatus::Active;
            existing.storage_path = storage_path.to_string();
            existing.display_name = display_name.to_string();
            existing.reference_count = 0;
            existing.remote_object_key = None;
            return Ok((existing.clone(), true));
        }

        let record = StoredFile {
            id: Uuid::new_v4(),
            content_hash: content_hash.to_string(),
            display_name: display_name.to_string(),
            size_bytes,
            storage_path: storage_path.to_string(),
            status: FileStatus::Active,
            reference_count: 0,
            remote_object_key: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        files.insert(record.id, record.clone());
        Ok((record, true))
    }

    async fn link_exists(&self, user_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        Ok(self.links.lock().unwrap().contains(&(user_id, file_id)))
    }

    async fn link(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        _logical_name: &str,
    ) -> Result<LinkOutcome, AppError> {
        let mut links = self.links.lock().unwrap();
        if !links.insert((user_id, file_id)) {
            return Ok(LinkOutcome::Repeat);
        }
        let mut files = self.files.lock().unwrap();
        let record = files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;
        record.reference_count += 1;
        Ok(LinkOutcome::Linked)
    }

    async fn unlink(&self, user_id: Uuid, file_id: Uuid) -> Result<UnlinkOutcome, AppError> {
        let mut links = self.links.lock().unwrap();
        if !links.remove(&(user_id, file_id)) {
            return Err(AppError::NotFound(format!(
                "No link between user {} and file {}",
                user_id, file_id
            )));
        }
        let mut files = self.files.lock().unwrap();
        let record = files
            .get_mut(&file_id)
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;
        record.reference_count = (record.reference_count - 1).max(0);
        if record.reference_count == 0 {
            record.status = FileStatus::Deleted;
        }
        Ok(UnlinkOutcome {
            remaining_links: record.reference_count,
            storage_path: record.storage_path.clone(),
            remote_object_key: record.remote_object_key.clone(),
        })
    }

    async fn get(&self, file_id: Uuid) -> Result<Option<StoredFile>, AppError> {
        Ok(self.files.lock().unwrap().get(&file_id).cloned())
    }
}

#[derive(Default)]
struct MemoryTransferProducer {
    published: Mutex<Vec<TransferMessage>>,
}

impl MemoryTransferProducer {
    fn published(&self) -> Vec<TransferMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferProducer for MemoryTransferProducer {
    async fn publish(&self, message: &TransferMessage) -> Result<(), AppError> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    service: UploadService,
    index: Arc<MemoryFileIndex>,
    transfers: Arc<MemoryTransferProducer>,
    _file_store: TempDir,
    _staging: TempDir,
    _remote: TempDir,
}

async fn harness() -> Harness {
    let file_store = tempdir().unwrap();
    let staging = tempdir().unwrap();
    let remote_dir = tempdir().unwrap();

    let index = Arc::new(MemoryFileIndex::default());
    let transfers = Arc::new(MemoryTransferProducer::default());
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let remote: Arc<dyn RemoteStore> = Arc::new(
        LocalRemoteStore::new(remote_dir.path(), "http://localhost/depot".to_string())
            .await
            .unwrap(),
    );

    let service = UploadService::new(
        index.clone(),
        sessions,
        transfers.clone(),
        remote,
        DeletionPool::new(2),
        file_store.path().to_path_buf(),
        staging.path().to_path_buf(),
        "file-store".to_string(),
    );

    Harness {
        service,
        index,
        transfers,
        _file_store: file_store,
        _staging: staging,
        _remote: remote_dir,
    }
}

async fn wait_until_gone(path: &Path) {
    for _ in 0..200 {
        if !path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} still exists", path.display());
}

#[tokio::test]
async fn identical_content_from_two_users_shares_one_record() {
    let h = harness().await;
    let content = b"shared corpus".to_vec();
    let digest = hash::hash_bytes(&content);

    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let first = h
        .service
        .store_file(user_a, &digest, "corpus.txt", Bytes::from(content.clone()))
        .await
        .unwrap();
    let second = h
        .service
        .store_file(user_b, &digest, "corpus-copy.txt", Bytes::from(content))
        .await
        .unwrap();

    assert_eq!(first.file_id, second.file_id);
    assert_eq!(first.outcome, LinkOutcome::Linked);
    assert_eq!(second.outcome, LinkOutcome::Linked);
    assert!(!first.deduplicated);
    assert!(second.deduplicated);

    assert_eq!(h.index.file_count(), 1);
    assert_eq!(h.index.link_count(), 2);
    let record = h.index.by_hash(&digest).unwrap();
    assert_eq!(record.reference_count, 2);
}

#[tokio::test]
async fn repeat_upload_by_same_user_is_a_noop() {
    let h = harness().await;
    let content = b"idempotent content".to_vec();
    let digest = hash::hash_bytes(&content);
    let user = Uuid::new_v4();

    let first = h
        .service
        .store_file(user, &digest, "a.txt", Bytes::from(content.clone()))
        .await
        .unwrap();
    let second = h
        .service
        .store_file(user, &digest, "a.txt", Bytes::from(content))
        .await
        .unwrap();

    assert_eq!(first.outcome, LinkOutcome::Linked);
    assert_eq!(second.outcome, LinkOutcome::Repeat);

    let record = h.index.by_hash(&digest).unwrap();
    assert_eq!(record.reference_count, 1);
    assert_eq!(h.index.link_count(), 1);
    // Only the first (linking) upload published a transfer.
    assert_eq!(h.transfers.published().len(), 1);
}

#[tokio::test]
async fn unlink_last_owner_schedules_physical_deletion() {
    let h = harness().await;
    let content = b"to be deleted".to_vec();
    let digest = hash::hash_bytes(&content);
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let outcome = h
        .service
        .store_file(user_a, &digest, "doc.bin", Bytes::from(content.clone()))
        .await
        .unwrap();
    h.service
        .store_file(user_b, &digest, "doc.bin", Bytes::from(content))
        .await
        .unwrap();

    let record = h.index.by_hash(&digest).unwrap();
    let canonical = std::path::PathBuf::from(&record.storage_path);
    assert!(canonical.exists());

    // Non-last unlink leaves the physical file for the remaining owner.
    let partial = h.service.remove_file(user_b, outcome.file_id).await.unwrap();
    assert_eq!(partial.remaining_links, 1);
    assert!(!partial.removed_last());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(canonical.exists());

    // Last unlink drives the count to zero and removes the bytes.
    let last = h.service.remove_file(user_a, outcome.file_id).await.unwrap();
    assert_eq!(last.remaining_links, 0);
    assert!(last.removed_last());
    wait_until_gone(&canonical).await;

    let record = h.index.by_hash(&digest).unwrap();
    assert_eq!(record.status, FileStatus::Deleted);
}

#[tokio::test]
async fn unlink_without_link_is_not_found() {
    let h = harness().await;
    let err = h
        .service
        .remove_file(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn chunked_upload_is_arrival_order_independent() {
    let h = harness().await;
    let user = Uuid::new_v4();

    let chunks: Vec<&[u8]> = vec![b"alpha-", b"beta-", b"gamma"];
    let mut whole = Vec::new();
    for c in &chunks {
        whole.extend_from_slice(c);
    }
    let digest = hash::hash_bytes(&whole);

    // Arrival order 2, 0, 1; assembly must follow declared indices.
    for index in [2usize, 0, 1] {
        h.service
            .receive_chunk(
                "upload-ooo",
                index as i32,
                3,
                &hash::hash_bytes(chunks[index]),
                "merged.bin",
                Bytes::copy_from_slice(chunks[index]),
            )
            .await
            .unwrap();
    }

    let outcome = h
        .service
        .merge_chunks("upload-ooo", user, &digest)
        .await
        .unwrap();
    assert_eq!(outcome.outcome, LinkOutcome::Linked);

    let record = h.index.by_hash(&digest).unwrap();
    assert_eq!(record.size_bytes, whole.len() as i64);
    let merged = tokio::fs::read(&record.storage_path).await.unwrap();
    assert_eq!(merged, whole);
}

#[tokio::test]
async fn merge_with_missing_chunk_is_rejected_then_retryable() {
    let h = harness().await;
    let user = Uuid::new_v4();

    let chunks: Vec<&[u8]> = vec![b"one", b"two", b"three"];
    let mut whole = Vec::new();
    for c in &chunks {
        whole.extend_from_slice(c);
    }
    let digest = hash::hash_bytes(&whole);

    for index in [0usize, 1] {
        h.service
            .receive_chunk(
                "upload-gap",
                index as i32,
                3,
                &hash::hash_bytes(chunks[index]),
                "gap.bin",
                Bytes::copy_from_slice(chunks[index]),
            )
            .await
            .unwrap();
    }

    let err = h
        .service
        .merge_chunks("upload-gap", user, &digest)
        .await
        .unwrap_err();
    match err {
        AppError::MissingChunk { index } => assert_eq!(index, 2),
        other => panic!("Expected MissingChunk, got {:?}", other),
    }

    // Supply the missing chunk and retry.
    h.service
        .receive_chunk(
            "upload-gap",
            2,
            3,
            &hash::hash_bytes(chunks[2]),
            "gap.bin",
            Bytes::copy_from_slice(chunks[2]),
        )
        .await
        .unwrap();

    let outcome = h
        .service
        .merge_chunks("upload-gap", user, &digest)
        .await
        .unwrap();
    assert_eq!(outcome.outcome, LinkOutcome::Linked);
}

#[tokio::test]
async fn merge_hash_mismatch_discards_assembly() {
    let h = harness().await;
    let user = Uuid::new_v4();

    let chunk = b"actual bytes".to_vec();
    h.service
        .receive_chunk(
            "upload-bad",
            0,
            1,
            &hash::hash_bytes(&chunk),
            "bad.bin",
            Bytes::from(chunk),
        )
        .await
        .unwrap();

    let wrong_digest = hash::hash_bytes(b"different bytes entirely");
    let err = h
        .service
        .merge_chunks("upload-bad", user, &wrong_digest)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HashMismatch { .. }));

    // No record was created and no partial file is reachable.
    assert_eq!(h.index.file_count(), 0);
    let mut entries = tokio::fs::read_dir(h._file_store.path()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn single_shot_hash_mismatch_removes_bytes() {
    let h = harness().await;
    let user = Uuid::new_v4();

    let wrong_digest = hash::hash_bytes(b"what the client claimed");
    let err = h
        .service
        .store_file(user, &wrong_digest, "liar.bin", Bytes::from_static(b"what was sent"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HashMismatch { .. }));

    assert_eq!(h.index.file_count(), 0);
    assert!(h.transfers.published().is_empty());
    let mut entries = tokio::fs::read_dir(h._file_store.path()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_chunk_is_rejected_at_receipt() {
    let h = harness().await;

    let declared = hash::hash_bytes(b"pristine chunk");
    let err = h
        .service
        .receive_chunk(
            "upload-corrupt",
            0,
            2,
            &declared,
            "c.bin",
            Bytes::from_static(b"corrupted in flight"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::HashMismatch { .. }));
}

#[tokio::test]
async fn chunked_and_single_shot_agree_on_digest() {
    let h = harness().await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let whole = b"same bytes either way".to_vec();
    let digest = hash::hash_bytes(&whole);

    h.service
        .store_file(user_a, &digest, "whole.bin", Bytes::from(whole.clone()))
        .await
        .unwrap();

    let (left, right) = whole.split_at(9);
    for (index, part) in [(0, left), (1, right)] {
        h.service
            .receive_chunk(
                "upload-agree",
                index,
                2,
                &hash::hash_bytes(part),
                "whole.bin",
                Bytes::copy_from_slice(part),
            )
            .await
            .unwrap();
    }

    let merged = h
        .service
        .merge_chunks("upload-agree", user_b, &digest)
        .await
        .unwrap();

    // The chunked path landed on the same record: dedup worked across paths.
    assert!(merged.deduplicated);
    assert_eq!(h.index.file_count(), 1);
    assert_eq!(h.index.by_hash(&digest).unwrap().reference_count, 2);
}

#[tokio::test]
async fn fast_upload_outcomes() {
    let h = harness().await;
    let owner = Uuid::new_v4();
    let newcomer = Uuid::new_v4();

    let content = b"fast upload target".to_vec();
    let digest = hash::hash_bytes(&content);

    assert_eq!(
        h.service.fast_upload(owner, &digest, "f.bin").await.unwrap(),
        FastUploadOutcome::NotExists
    );

    let uploaded = h
        .service
        .store_file(owner, &digest, "f.bin", Bytes::from(content))
        .await
        .unwrap();

    assert_eq!(
        h.service.fast_upload(newcomer, &digest, "f.bin").await.unwrap(),
        FastUploadOutcome::Linked {
            file_id: uploaded.file_id
        }
    );
    assert_eq!(
        h.service.fast_upload(newcomer, &digest, "f.bin").await.unwrap(),
        FastUploadOutcome::Repeat {
            file_id: uploaded.file_id
        }
    );

    assert_eq!(h.index.by_hash(&digest).unwrap().reference_count, 2);
}

#[tokio::test]
async fn transfer_message_carries_prefixed_key_and_canonical_path() {
    let h = harness().await;
    let user = Uuid::new_v4();

    let content = b"archive me".to_vec();
    let digest = hash::hash_bytes(&content);

    let outcome = h
        .service
        .store_file(user, &digest, "archive.bin", Bytes::from(content))
        .await
        .unwrap();

    let published = h.transfers.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].file_id, outcome.file_id);
    assert_eq!(published[0].remote_object_key, "file-store/archive.bin");

    let record = h.index.by_hash(&digest).unwrap();
    assert_eq!(published[0].local_path, record.storage_path);
}
