//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for favicon_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => favicon_core::AppError::NotFound(key),
            StorageError::InvalidKey(msg) => favicon_core::AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => favicon_core::AppError::Config(msg),
            other => favicon_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Object attributes applied on upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    pub cache_control: Option<String>,
}

impl UploadOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: None,
        }
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: u64,
    /// Creation time of the object. Objects are never modified in place, so
    /// backends that only track modification time report that.
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait so the
/// pipeline and the sweep never couple to a specific backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Upload data to a specific storage key, replacing any existing object.
    /// Returns the durable URL of the uploaded object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> StorageResult<String>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Durable URL for an object. The URL does not expire.
    fn object_url(&self, storage_key: &str) -> StorageResult<String>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
