//! Mock favicon record store for testing without a database

use async_trait::async_trait;
use chrono::Utc;
use favicon_core::{AppError, FaviconRecord, FaviconStatus, GeneratedFiles, NewFaviconRecord};
use favicon_db::FaviconRecordStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory store mirroring the Postgres repository's conditional updates
/// and its unique `source_object` column.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    records: Arc<Mutex<Vec<FaviconRecord>>>,
    stolen: Arc<Mutex<HashMap<Uuid, Option<String>>>>,
    mutations: Arc<AtomicUsize>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a mutation.
    pub fn insert(&self, record: FaviconRecord) -> FaviconRecord {
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn record(&self, id: Uuid) -> Option<FaviconRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<FaviconRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts and updates performed through the `FaviconRecordStore` trait.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Simulate another run completing `id` just before the next claim of it.
    pub fn steal_on_next_claim(&self, id: Uuid) {
        self.stolen.lock().unwrap().insert(id, None);
    }

    /// Like [`Self::steal_on_next_claim`], with the other run storing
    /// `source_object` on the record it completed.
    pub fn steal_on_next_claim_from(&self, id: Uuid, source_object: &str) {
        self.stolen
            .lock()
            .unwrap()
            .insert(id, Some(source_object.to_string()));
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

fn unique_violation(source_object: &str) -> AppError {
    AppError::Database(sqlx::Error::Protocol(format!(
        "duplicate key value violates unique constraint \"site_images_source_object_key\": {}",
        source_object
    )))
}

#[async_trait]
impl FaviconRecordStore for MockRecordStore {
    async fn recent_processing(&self, limit: i64) -> Result<Vec<FaviconRecord>, AppError> {
        let mut pending: Vec<FaviconRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_processing())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FaviconRecord>, AppError> {
        Ok(self.record(id))
    }

    async fn find_by_source_object(
        &self,
        source_object: &str,
    ) -> Result<Option<FaviconRecord>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.source_object.as_deref() == Some(source_object))
            .cloned())
    }

    async fn claim(
        &self,
        id: Uuid,
        source_object: &str,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        if let Some(thief) = self.stolen.lock().unwrap().remove(&id) {
            record.status = FaviconStatus::Completed;
            if thief.is_some() {
                record.source_object = thief;
            }
        }
        if !record.is_processing() {
            return Ok(None);
        }

        if records
            .iter()
            .any(|r| r.id != id && r.source_object.as_deref() == Some(source_object))
        {
            return Err(unique_violation(source_object));
        }

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        record.status = FaviconStatus::Completed;
        record.generated_files = Some(files.clone());
        record.generated_at = Some(Utc::now());
        record.source_object = Some(source_object.to_string());
        let claimed = record.clone();
        drop(records);

        self.mutated();
        Ok(Some(claimed))
    }

    async fn refresh(
        &self,
        id: Uuid,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records
            .iter_mut()
            .find(|r| r.id == id && !r.is_processing())
        else {
            return Ok(None);
        };

        record.generated_files = Some(files.clone());
        record.generated_at = Some(Utc::now());
        let refreshed = record.clone();
        drop(records);

        self.mutated();
        Ok(Some(refreshed))
    }

    async fn upsert_completed(&self, new: NewFaviconRecord) -> Result<FaviconRecord, AppError> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.source_object.is_some() && r.source_object == new.source_object)
        {
            existing.status = FaviconStatus::Completed;
            existing.generated_files = new.generated_files;
            existing.generated_at = Some(now);
            let updated = existing.clone();
            drop(records);
            self.mutated();
            return Ok(updated);
        }

        let record = FaviconRecord {
            id: Uuid::new_v4(),
            status: FaviconStatus::Completed,
            url: new.url,
            source_url: new.source_url,
            filename: new.filename,
            size: new.size,
            is_active: false,
            created_at: now,
            generated_at: Some(now),
            generated_files: new.generated_files,
            source_object: new.source_object,
        };
        records.push(record.clone());
        drop(records);

        self.mutated();
        Ok(record)
    }

    async fn create_processing(&self, new: NewFaviconRecord) -> Result<FaviconRecord, AppError> {
        let record = FaviconRecord {
            id: Uuid::new_v4(),
            status: FaviconStatus::Processing,
            url: new.url,
            source_url: new.source_url,
            filename: new.filename,
            size: new.size,
            is_active: false,
            created_at: Utc::now(),
            generated_at: None,
            generated_files: None,
            source_object: None,
        };
        self.records.lock().unwrap().push(record.clone());
        self.mutated();
        Ok(record)
    }
}
