//! Links a finished icon set to its favicon record.
//!
//! The uploading client writes a `processing` record before the file lands in
//! storage, but nothing ties the stored object back to that row except the
//! upload timestamp embedded in both the object name (`favicon_<millis>.png`)
//! and the record's URL. Resolution order:
//!
//! 1. a record already completed from this exact source key (redelivered event)
//! 2. the record named by the object's `favicon-record-id` metadata
//! 3. recent processing records, token match first, then newest
//! 4. a new completed record
//!
//! The source key includes the object generation, so overwriting an already
//! processed name starts again at step 2 instead of refreshing the old record.

use std::sync::{Arc, LazyLock};

use favicon_core::{
    AppError, FaviconRecord, FaviconStatus, GeneratedFiles, NewFaviconRecord, UploadEvent,
};
use favicon_db::FaviconRecordStore;
use favicon_storage::Storage;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"favicon_(\d+)").expect("favicon token pattern is valid"));

/// How the owning record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Record already completed from the same source object; files rewritten.
    Refreshed,
    /// Record named by the upload metadata.
    ClaimedById,
    /// Pending record whose URL contains the filename token.
    ClaimedByToken,
    /// Newest pending record without a token match.
    ClaimedMostRecent,
    /// No pending record could be claimed.
    Created,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub record: FaviconRecord,
    pub resolution: Resolution,
}

/// Numeric upload token in a source filename, e.g. `1700000000000` in
/// `favicon_1700000000000.png`.
pub fn extract_token(file_name: &str) -> Option<&str> {
    TOKEN_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Candidates in the order they should be claimed.
///
/// Records whose URL contains the token come first, in recency order, followed
/// by the rest in recency order. `candidates` must already be newest first.
pub fn preference_order<'a>(
    candidates: &'a [FaviconRecord],
    token: Option<&str>,
) -> Vec<(&'a FaviconRecord, Resolution)> {
    let matches = |record: &FaviconRecord| token.is_some_and(|t| record.url.contains(t));

    let matched = candidates
        .iter()
        .filter(|r| matches(*r))
        .map(|r| (r, Resolution::ClaimedByToken));
    let rest = candidates
        .iter()
        .filter(|r| !matches(*r))
        .map(|r| (r, Resolution::ClaimedMostRecent));

    matched.chain(rest).collect()
}

/// The record the matching heuristic selects, if there is any candidate.
pub fn select_candidate<'a>(
    candidates: &'a [FaviconRecord],
    token: Option<&str>,
) -> Option<&'a FaviconRecord> {
    preference_order(candidates, token)
        .into_iter()
        .next()
        .map(|(record, _)| record)
}

#[derive(Clone)]
pub struct RecordReconciler {
    records: Arc<dyn FaviconRecordStore>,
    storage: Arc<dyn Storage>,
    candidate_limit: i64,
}

impl RecordReconciler {
    pub fn new(
        records: Arc<dyn FaviconRecordStore>,
        storage: Arc<dyn Storage>,
        candidate_limit: i64,
    ) -> Self {
        Self {
            records,
            storage,
            candidate_limit,
        }
    }

    #[tracing::instrument(skip(self, event, files), fields(object = %event.object_path, generation = ?event.generation))]
    pub async fn reconcile(
        &self,
        event: &UploadEvent,
        files: &GeneratedFiles,
    ) -> Result<Reconciliation, AppError> {
        let source_key = event.source_key();
        let source_object = source_key.as_str();

        if let Some(existing) = self.records.find_by_source_object(source_object).await? {
            if let Some(record) = self.records.refresh(existing.id, files).await? {
                return Ok(self.resolved(record, Resolution::Refreshed));
            }
        }

        if let Some(id) = event.record_id_hint() {
            match self.records.claim(id, source_object, files).await? {
                Some(record) => return Ok(self.resolved(record, Resolution::ClaimedById)),
                None => tracing::warn!(
                    record_id = %id,
                    "Record named in upload metadata is missing or already completed, falling back to matching"
                ),
            }
        }

        let candidates = self.records.recent_processing(self.candidate_limit).await?;
        let token = extract_token(event.file_name());

        tracing::debug!(
            candidates = candidates.len(),
            token = ?token,
            "Matching pending favicon records"
        );

        for (candidate, resolution) in preference_order(&candidates, token) {
            match self.records.claim(candidate.id, source_object, files).await? {
                Some(record) => return Ok(self.resolved(record, resolution)),
                None => tracing::debug!(
                    record_id = %candidate.id,
                    "Candidate claimed by another run, trying next"
                ),
            }
        }

        let record = self.create(event, files).await?;
        Ok(self.resolved(record, Resolution::Created))
    }

    async fn create(
        &self,
        event: &UploadEvent,
        files: &GeneratedFiles,
    ) -> Result<FaviconRecord, AppError> {
        let source_url = self.storage.object_url(&event.object_path)?;
        let size = i64::try_from(event.size_bytes).ok();

        let record = NewFaviconRecord {
            status: FaviconStatus::Completed,
            url: source_url.clone(),
            source_url: Some(source_url),
            filename: Some(event.file_name().to_string()),
            size,
            generated_files: Some(files.clone()),
            source_object: Some(event.source_key()),
        };

        self.records.upsert_completed(record).await
    }

    fn resolved(&self, record: FaviconRecord, resolution: Resolution) -> Reconciliation {
        tracing::info!(
            record_id = %record.id,
            resolution = ?resolution,
            "Favicon record reconciled"
        );
        Reconciliation { record, resolution }
    }

    /// Insert a pending record the way the uploading client does before the
    /// file reaches storage.
    pub async fn request(
        &self,
        object_path: &str,
        size: Option<i64>,
    ) -> Result<FaviconRecord, AppError> {
        let url = self.storage.object_url(object_path)?;
        let filename = object_path.rsplit('/').next().map(String::from);
        self.records
            .create_processing(NewFaviconRecord::processing(url, filename, size))
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<FaviconRecord>, AppError> {
        self.records.get(id).await
    }
}
