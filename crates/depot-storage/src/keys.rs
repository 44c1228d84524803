//! Object key generation and validation.

use crate::traits::{RemoteStoreError, RemoteStoreResult};

/// Build the remote object key for a file: `<prefix>/<display_name>`.
///
/// The key derives from the display name, not the content hash, so archiving
/// the same content under different names produces distinct remote objects.
/// Only the final path component of the name is used.
pub fn object_key(prefix: &str, display_name: &str) -> String {
    let name = display_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(display_name);
    format!("{}/{}", prefix.trim_matches('/'), name)
}

/// Reject keys that could escape the backend's namespace.
pub fn validate_key(object_key: &str) -> RemoteStoreResult<()> {
    if object_key.is_empty()
        || object_key.starts_with('/')
        || object_key.split('/').any(|part| part == "..")
    {
        return Err(RemoteStoreError::InvalidKey(format!(
            "Object key contains invalid components: {}",
            object_key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_prefix_and_name() {
        assert_eq!(object_key("file-store", "report.pdf"), "file-store/report.pdf");
        assert_eq!(object_key("file-store/", "report.pdf"), "file-store/report.pdf");
    }

    #[test]
    fn key_strips_client_path_components() {
        assert_eq!(
            object_key("file-store", "../../etc/passwd"),
            "file-store/passwd"
        );
        assert_eq!(
            object_key("file-store", "C:\\Users\\me\\notes.txt"),
            "file-store/notes.txt"
        );
    }

    #[test]
    fn validation_rejects_traversal() {
        assert!(validate_key("file-store/report.pdf").is_ok());
        assert!(validate_key("/absolute").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("").is_err());
    }
}
