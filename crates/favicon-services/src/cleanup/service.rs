use std::sync::Arc;

use chrono::Utc;
use favicon_core::{constants, FaviconConfig};
use favicon_storage::{ObjectInfo, Storage};
use futures::future::join_all;
use serde::Serialize;

use super::schedule::WeeklySchedule;

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub listed: usize,
    pub kept: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Source files to delete: every object whose key contains `marker`, except
/// the `keep` most recently created.
pub fn select_stale(mut objects: Vec<ObjectInfo>, marker: &str, keep: usize) -> Vec<ObjectInfo> {
    objects.retain(|o| o.key.contains(marker));
    objects.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.key.cmp(&a.key))
    });
    objects.into_iter().skip(keep).collect()
}

#[derive(Clone)]
pub struct CleanupService {
    storage: Arc<dyn Storage>,
    prefix: String,
    marker: String,
    keep: usize,
    schedule: WeeklySchedule,
}

impl CleanupService {
    pub fn new(storage: Arc<dyn Storage>, prefix: impl Into<String>, keep: usize) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            marker: constants::CLEANUP_SOURCE_MARKER.to_string(),
            keep,
            schedule: WeeklySchedule::default(),
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &FaviconConfig) -> Self {
        Self::new(storage, config.cleanup_prefix.clone(), config.cleanup_keep)
    }

    /// Start the background sweep on its weekly schedule
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next_run = self.schedule.next_after(now);
                tracing::info!(next_run = %next_run, "Favicon source sweep scheduled");

                tokio::time::sleep(self.schedule.until_next(now)).await;

                tracing::info!("Starting scheduled favicon source sweep");
                self.run_once().await;
            }
        })
    }

    /// Sweep once. Failures are logged and counted, never returned.
    #[tracing::instrument(skip(self), fields(cleanup.prefix = %self.prefix, cleanup.keep = self.keep))]
    pub async fn run_once(&self) -> SweepReport {
        let objects = match self.storage.list(&self.prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list favicon source files");
                return SweepReport::default();
            }
        };

        let listed = objects.len();
        let sources = objects
            .iter()
            .filter(|o| o.key.contains(&self.marker))
            .count();
        let stale = select_stale(objects, &self.marker, self.keep);

        let results = join_all(stale.iter().map(|object| async move {
            match self.storage.delete(&object.key).await {
                Ok(()) => {
                    tracing::debug!(key = %object.key, created_at = %object.created_at, "Deleted old favicon source");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, key = %object.key, "Failed to delete favicon source, continuing");
                    false
                }
            }
        }))
        .await;

        let deleted = results.iter().filter(|ok| **ok).count();
        let report = SweepReport {
            listed,
            kept: sources - stale.len(),
            deleted,
            failed: results.len() - deleted,
        };

        tracing::info!(
            listed = report.listed,
            kept = report.kept,
            deleted = report.deleted,
            failed = report.failed,
            "Favicon source sweep completed"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockStorage;
    use chrono::{DateTime, Duration};

    fn info(key: &str, created_at: DateTime<Utc>) -> ObjectInfo {
        ObjectInfo {
            key: key.to_string(),
            size_bytes: 1,
            created_at,
        }
    }

    #[test]
    fn test_select_stale_keeps_newest() {
        let now = Utc::now();
        let objects = (0..8)
            .map(|i| info(&format!("admin/favicon/source-{i}.png"), now - Duration::hours(i)))
            .collect();

        let stale: Vec<String> = select_stale(objects, "source-", 5)
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(
            stale,
            vec![
                "admin/favicon/source-5.png",
                "admin/favicon/source-6.png",
                "admin/favicon/source-7.png",
            ]
        );
    }

    #[test]
    fn test_select_stale_ignores_other_files() {
        let now = Utc::now();
        let objects = vec![
            info("admin/favicon/source-1.png", now),
            info("admin/favicon/preview.png", now - Duration::days(30)),
        ];
        assert!(select_stale(objects, "source-", 1).is_empty());
    }

    #[tokio::test]
    async fn test_run_once_deletes_all_but_five() {
        let storage = Arc::new(MockStorage::new());
        let now = Utc::now();
        for i in 0..8 {
            storage.put_with_created(
                &format!("admin/favicon/source-{i}.png"),
                b"x".to_vec(),
                "image/png",
                now - Duration::days(i),
            );
        }
        storage.put_with_created("admin/favicon/notes.txt", b"x".to_vec(), "text/plain", now - Duration::days(90));

        let service = CleanupService::new(storage.clone(), "admin/favicon/", 5);
        let report = service.run_once().await;

        assert_eq!(
            report,
            SweepReport {
                listed: 9,
                kept: 5,
                deleted: 3,
                failed: 0
            }
        );
        let remaining = storage.keys_with_prefix("admin/favicon/source-");
        assert_eq!(
            remaining,
            (0..5)
                .map(|i| format!("admin/favicon/source-{i}.png"))
                .collect::<Vec<_>>()
        );
        assert!(storage.has_file("admin/favicon/notes.txt"));
    }

    #[tokio::test]
    async fn test_failed_delete_is_counted_not_raised() {
        let storage = Arc::new(MockStorage::new());
        let now = Utc::now();
        for i in 0..3 {
            storage.put_with_created(
                &format!("admin/favicon/source-{i}.png"),
                b"x".to_vec(),
                "image/png",
                now - Duration::days(i),
            );
        }
        storage.fail_deletes_for("admin/favicon/source-2.png");

        let report = CleanupService::new(storage.clone(), "admin/favicon/", 1)
            .run_once()
            .await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert!(storage.has_file("admin/favicon/source-2.png"));
        assert!(!storage.has_file("admin/favicon/source-1.png"));
    }
}
