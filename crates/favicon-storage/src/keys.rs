//! Shared key handling for storage backends.

use crate::traits::{StorageError, StorageResult};

/// Reject keys that could escape the bucket root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Key of a published icon: `{public_prefix}{filename}`.
pub fn published_key(public_prefix: &str, filename: &str) -> String {
    if public_prefix.is_empty() || public_prefix.ends_with('/') {
        format!("{}{}", public_prefix, filename)
    } else {
        format!("{}/{}", public_prefix, filename)
    }
}
