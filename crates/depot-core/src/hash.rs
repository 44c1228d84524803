//! Content hashing
//!
//! SHA-256 digests are the dedup identity of a file and the end-to-end
//! integrity check for uploads. The same bytes always produce the same hex
//! digest whether they arrive single-shot or chunked and merged.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Hash an in-memory byte slice.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash a file's full content.
///
/// Opens a fresh handle so the digest always covers the file from its start,
/// regardless of where a previous writer left the cursor.
pub async fn hash_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check that a client-declared digest is a plausible hex SHA-256.
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == DIGEST_HEX_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalize a client-declared digest for comparison and storage.
pub fn normalize_digest(digest: &str) -> String {
    digest.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hash_bytes_is_deterministic() {
        let a = hash_bytes(b"hello world");
        let b = hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), DIGEST_HEX_LEN);
        // Known vector for "hello world"
        assert_eq!(
            a,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn hash_file_matches_hash_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let content = b"some file content".to_vec();
        tokio::fs::write(&path, &content).await.unwrap();

        let from_file = hash_file(&path).await.unwrap();
        assert_eq!(from_file, hash_bytes(&content));
    }

    #[tokio::test]
    async fn hash_of_concatenated_chunks_equals_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.bin");

        let chunks: Vec<&[u8]> = vec![b"first-", b"second-", b"third"];
        let mut whole = Vec::new();
        for c in &chunks {
            whole.extend_from_slice(c);
        }
        tokio::fs::write(&path, &whole).await.unwrap();

        assert_eq!(hash_file(&path).await.unwrap(), hash_bytes(&whole));
    }

    #[test]
    fn digest_validation() {
        let good = hash_bytes(b"x");
        assert!(is_valid_digest(&good));
        assert!(is_valid_digest(&good.to_uppercase()));
        assert!(!is_valid_digest("abc123"));
        assert!(!is_valid_digest(&"z".repeat(DIGEST_HEX_LEN)));
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize_digest("ABCDEF"), "abcdef");
    }
}
