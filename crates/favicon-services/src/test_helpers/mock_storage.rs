//! Mock Storage implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use favicon_storage::{
    ObjectInfo, Storage, StorageBackend, StorageError, StorageResult, UploadOptions,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const MOCK_BASE_URL: &str = "https://storage.test";

/// An object held by [`MockStorage`] with the attributes it was written with.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Mock storage implementation that stores files in memory
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    failing_uploads: Arc<Mutex<HashSet<String>>>,
    failing_deletes: Arc<Mutex<HashSet<String>>>,
    writes: Arc<AtomicUsize>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write.
    pub fn set_file(&self, key: &str, data: impl Into<Bytes>, content_type: &str) {
        self.put_with_created(key, data, content_type, Utc::now());
    }

    /// Seed an object with an explicit creation time.
    pub fn put_with_created(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
        created_at: DateTime<Utc>,
    ) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.into(),
                content_type: content_type.to_string(),
                cache_control: None,
                created_at,
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Sorted keys under `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Uploads and deletes performed through the `Storage` trait.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_uploads_for(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_deletes_for(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> StorageResult<String> {
        if self.failing_uploads.lock().unwrap().contains(storage_key) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: options.content_type.clone(),
                cache_control: options.cache_control.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(format!("{}/{}", MOCK_BASE_URL, storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(storage_key) {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    fn object_url(&self, storage_key: &str) -> StorageResult<String> {
        Ok(format!("{}/{}", MOCK_BASE_URL, storage_key))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let mut listed: Vec<ObjectInfo> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size_bytes: object.data.len() as u64,
                created_at: object.created_at,
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listed)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
