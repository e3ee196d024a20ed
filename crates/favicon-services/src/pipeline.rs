//! Favicon pipeline orchestration
//!
//! One run per upload event:
//!
//! ```text
//! Received -> Downloaded -> BaseNormalized -> DerivativesGenerated
//!          -> Packaged -> Published -> Reconciled -> CleanedUp
//! ```
//!
//! Uploads outside the watched prefix or without an image content type end the
//! run as [`PipelineOutcome::Ignored`] before anything is touched. Any other
//! error fails the run with the stage it was trying to reach. The run's working
//! directory is removed on both paths; published objects and database writes
//! are never rolled back.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use favicon_core::{
    constants, AppError, ErrorMetadata, FaviconConfig, GeneratedFiles, IconTarget, UploadEvent,
};
use favicon_db::FaviconRecordStore;
use favicon_processing::{
    derive_targets, DerivedImage, IconArtifact, IconPackager, ImageProcessor, ImageResize,
};
use favicon_storage::Storage;
use image::DynamicImage;
use serde::Serialize;
use tempfile::TempDir;
use uuid::Uuid;

use crate::publisher::ArtifactPublisher;
use crate::reconciler::{RecordReconciler, Resolution};

/// Run states in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Downloaded,
    BaseNormalized,
    DerivativesGenerated,
    Packaged,
    Published,
    Reconciled,
    CleanedUp,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Downloaded => "downloaded",
            PipelineStage::BaseNormalized => "base_normalized",
            PipelineStage::DerivativesGenerated => "derivatives_generated",
            PipelineStage::Packaged => "packaged",
            PipelineStage::Published => "published",
            PipelineStage::Reconciled => "reconciled",
            PipelineStage::CleanedUp => "cleaned_up",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    OutsideWatchedPrefix,
    NotAnImage,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub record_id: Uuid,
    pub resolution: Resolution,
    pub object_path: String,
    pub version: String,
    pub files: GeneratedFiles,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Ignored { reason: IgnoreReason },
    Completed(PipelineReport),
}

/// A failed run. `stage` is the state the run was trying to reach.
#[derive(Debug, thiserror::Error)]
#[error("favicon pipeline failed before {stage}: {source}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub source: AppError,
}

impl PipelineFailure {
    fn at(stage: PipelineStage) -> impl FnOnce(AppError) -> PipelineFailure {
        move |source| PipelineFailure { stage, source }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub watch_prefix: String,
    pub public_prefix: String,
    pub base_size: u32,
    pub candidate_limit: i64,
    /// Parent of the per-run working directories; the system temp dir when unset.
    pub tmp_root: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            watch_prefix: constants::WATCH_PREFIX.to_string(),
            public_prefix: constants::PUBLIC_PREFIX.to_string(),
            base_size: constants::BASE_SIZE,
            candidate_limit: constants::CANDIDATE_LIMIT,
            tmp_root: None,
        }
    }
}

impl From<&FaviconConfig> for PipelineSettings {
    fn from(config: &FaviconConfig) -> Self {
        Self {
            watch_prefix: config.watch_prefix.clone(),
            public_prefix: config.public_prefix.clone(),
            base_size: config.base_size,
            candidate_limit: config.candidate_limit,
            tmp_root: config.tmp_dir.clone(),
        }
    }
}

#[derive(Clone)]
pub struct FaviconPipeline {
    storage: Arc<dyn Storage>,
    publisher: ArtifactPublisher,
    reconciler: RecordReconciler,
    settings: PipelineSettings,
}

impl FaviconPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn FaviconRecordStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            publisher: ArtifactPublisher::new(storage.clone(), settings.public_prefix.clone()),
            reconciler: RecordReconciler::new(records, storage.clone(), settings.candidate_limit),
            storage,
            settings,
        }
    }

    pub fn reconciler(&self) -> &RecordReconciler {
        &self.reconciler
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Why `event` should not start a run, if it should not.
    pub fn ignore_reason(&self, event: &UploadEvent) -> Option<IgnoreReason> {
        if !event.object_path.starts_with(&self.settings.watch_prefix) {
            Some(IgnoreReason::OutsideWatchedPrefix)
        } else if !event.is_image() {
            Some(IgnoreReason::NotAnImage)
        } else {
            None
        }
    }

    #[tracing::instrument(skip(self, event), fields(bucket = %event.bucket, object = %event.object_path))]
    pub async fn run(&self, event: &UploadEvent) -> Result<PipelineOutcome, PipelineFailure> {
        if let Some(reason) = self.ignore_reason(event) {
            tracing::info!(
                reason = ?reason,
                content_type = ?event.content_type,
                "Upload does not trigger favicon generation"
            );
            return Ok(PipelineOutcome::Ignored { reason });
        }

        let start = std::time::Instant::now();
        let workdir = self
            .create_workdir()
            .map_err(PipelineFailure::at(PipelineStage::Downloaded))?;

        let result = self.execute(event, workdir.path()).await;
        remove_workdir(workdir);

        match result {
            Ok(report) => {
                tracing::info!(
                    stage = %PipelineStage::CleanedUp,
                    record_id = %report.record_id,
                    resolution = ?report.resolution,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Favicon set generated"
                );
                Ok(PipelineOutcome::Completed(report))
            }
            Err(failure) => {
                tracing::error!(
                    stage = %failure.stage,
                    error = %failure.source,
                    recoverable = failure.source.is_recoverable(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Favicon generation failed"
                );
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        event: &UploadEvent,
        workdir: &Path,
    ) -> Result<PipelineReport, PipelineFailure> {
        let version = Utc::now().timestamp_millis().to_string();

        let source = self
            .download(event, workdir)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Downloaded))?;
        tracing::debug!(stage = %PipelineStage::Downloaded, size_bytes = source.len());

        let base = self
            .normalize(source, workdir)
            .await
            .map_err(PipelineFailure::at(PipelineStage::BaseNormalized))?;
        tracing::debug!(stage = %PipelineStage::BaseNormalized, size = self.settings.base_size);

        let derived = derive_targets(Arc::new(base))
            .await
            .map_err(PipelineFailure::at(PipelineStage::DerivativesGenerated))?;
        tracing::debug!(stage = %PipelineStage::DerivativesGenerated, count = derived.len());

        let artifacts = self
            .package(derived, workdir)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Packaged))?;
        tracing::debug!(stage = %PipelineStage::Packaged, count = artifacts.len());

        let files = self
            .publisher
            .publish(&artifacts, &version)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Published))?;

        let reconciliation = self
            .reconciler
            .reconcile(event, &files)
            .await
            .map_err(PipelineFailure::at(PipelineStage::Reconciled))?;

        Ok(PipelineReport {
            record_id: reconciliation.record.id,
            resolution: reconciliation.resolution,
            object_path: event.object_path.clone(),
            version,
            files,
        })
    }

    fn create_workdir(&self) -> Result<TempDir, AppError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("favicon-");
        let dir = match self.settings.tmp_root {
            Some(ref root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn download(&self, event: &UploadEvent, workdir: &Path) -> Result<Vec<u8>, AppError> {
        let data = self
            .storage
            .download(&event.object_path)
            .await
            .map_err(|e| AppError::Download(format!("{}: {}", event.object_path, e)))?;

        let local = workdir.join(format!("source-{}", event.file_name()));
        tokio::fs::write(&local, &data).await?;
        Ok(data.to_vec())
    }

    async fn normalize(&self, source: Vec<u8>, workdir: &Path) -> Result<DynamicImage, AppError> {
        let base_size = self.settings.base_size;
        let (base, encoded) = tokio::task::spawn_blocking(move || {
            let decoded = ImageProcessor::decode(&source)?;
            let base = ImageResize::normalize_base(&decoded, base_size);
            let encoded = ImageProcessor::encode_png(&base)?;
            Ok::<_, AppError>((base, encoded))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Base normalisation task failed: {}", e)))??;

        tokio::fs::write(workdir.join(format!("base-{}.png", base_size)), &encoded).await?;
        Ok(base)
    }

    async fn package(
        &self,
        derived: Vec<DerivedImage>,
        workdir: &Path,
    ) -> Result<Vec<IconArtifact>, AppError> {
        let artifacts = tokio::task::spawn_blocking(move || {
            let find = |target: IconTarget| {
                derived.iter().find(|d| d.target == target).ok_or_else(|| {
                    AppError::Packaging(format!("missing {} derivative", target.name()))
                })
            };
            let mut artifacts = vec![IconPackager::package(
                find(IconTarget::Favicon16)?,
                find(IconTarget::Favicon32)?,
            )?];
            for image in &derived {
                artifacts.push(image.to_artifact()?);
            }
            Ok::<_, AppError>(artifacts)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Packaging task failed: {}", e)))??;

        for artifact in &artifacts {
            tokio::fs::write(workdir.join(artifact.filename), &artifact.bytes).await?;
        }
        Ok(artifacts)
    }
}

fn remove_workdir(workdir: TempDir) {
    let path = workdir.path().to_path_buf();
    if let Err(e) = workdir.close() {
        tracing::warn!(error = %e, path = %path.display(), "Failed to remove working directory");
    }
}
