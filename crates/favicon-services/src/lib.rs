//! Favicon Services Layer
//!
//! Orchestration of a favicon generation run (publish, reconcile, pipeline)
//! and the weekly source sweep. Entry points (HTTP service, CLI) depend on this
//! crate and stay thin.

pub mod cleanup;
pub mod pipeline;
pub mod publisher;
pub mod reconciler;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cleanup::{CleanupService, SweepReport, WeeklySchedule};
pub use favicon_db::{FaviconRecordRepository, FaviconRecordStore};
pub use favicon_storage::{create_storage, Storage, StorageBackend, StorageError};
pub use pipeline::{
    FaviconPipeline, IgnoreReason, PipelineFailure, PipelineOutcome, PipelineReport,
    PipelineSettings, PipelineStage,
};
pub use publisher::ArtifactPublisher;
pub use reconciler::{RecordReconciler, Reconciliation, Resolution};
