use std::collections::BTreeMap;
use std::sync::Arc;

use favicon_core::constants::CACHE_CONTROL_IMMUTABLE;
use favicon_core::{AppError, FaviconAsset, GeneratedFiles};
use favicon_processing::IconArtifact;
use favicon_storage::keys::published_key;
use favicon_storage::{Storage, UploadOptions};
use futures::future::try_join_all;

/// Uploads the icon set under the public prefix and collects its URLs.
#[derive(Clone)]
pub struct ArtifactPublisher {
    storage: Arc<dyn Storage>,
    public_prefix: String,
}

impl ArtifactPublisher {
    pub fn new(storage: Arc<dyn Storage>, public_prefix: impl Into<String>) -> Self {
        Self {
            storage,
            public_prefix: public_prefix.into(),
        }
    }

    /// Upload every artifact concurrently.
    ///
    /// Any failed upload fails the whole publish; objects already written stay
    /// in place and are overwritten by the next run. Each URL carries
    /// `?v=<version>` since the object paths never change.
    #[tracing::instrument(skip(self, artifacts), fields(count = artifacts.len(), version = %version))]
    pub async fn publish(
        &self,
        artifacts: &[IconArtifact],
        version: &str,
    ) -> Result<GeneratedFiles, AppError> {
        let start = std::time::Instant::now();

        let uploads = artifacts.iter().map(|artifact| {
            let key = published_key(&self.public_prefix, artifact.filename);
            let options = UploadOptions::new(artifact.mime_type)
                .with_cache_control(CACHE_CONTROL_IMMUTABLE);
            async move {
                let url = self
                    .storage
                    .upload_with_key(&key, artifact.bytes.clone(), &options)
                    .await
                    .map_err(|e| AppError::Publish(format!("{}: {}", key, e)))?;
                Ok::<(FaviconAsset, String), AppError>((artifact.asset, url))
            }
        });

        let uploaded = try_join_all(uploads).await?;

        let urls: BTreeMap<FaviconAsset, String> = uploaded
            .into_iter()
            .map(|(asset, url)| (asset, versioned(&url, version)))
            .collect();

        let files = GeneratedFiles::try_from(urls).map_err(AppError::Publish)?;

        tracing::info!(
            count = files.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Published favicon set"
        );

        Ok(files)
    }
}

fn versioned(url: &str, version: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}v={}", url, separator, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockStorage;
    use bytes::Bytes;

    fn artifacts() -> Vec<IconArtifact> {
        FaviconAsset::ALL
            .into_iter()
            .map(|asset| IconArtifact::new(asset, Bytes::from_static(b"data")))
            .collect()
    }

    #[tokio::test]
    async fn test_publish_uploads_six_with_cache_control() {
        let storage = Arc::new(MockStorage::new());
        let publisher = ArtifactPublisher::new(storage.clone(), "public/favicon/");

        let files = publisher.publish(&artifacts(), "1700000000000").await.unwrap();

        assert_eq!(files.len(), 6);
        assert_eq!(
            files.get(FaviconAsset::Ico),
            "https://storage.test/public/favicon/favicon.ico?v=1700000000000"
        );

        let stored = storage.keys_with_prefix("public/favicon/");
        assert_eq!(stored.len(), 6);
        let ico = storage.object("public/favicon/favicon.ico").unwrap();
        assert_eq!(ico.content_type, "image/x-icon");
        assert_eq!(ico.cache_control.as_deref(), Some(CACHE_CONTROL_IMMUTABLE));
        let png = storage.object("public/favicon/favicon-16x16.png").unwrap();
        assert_eq!(png.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_single_failed_upload_fails_publish() {
        let storage = Arc::new(MockStorage::new());
        storage.fail_uploads_for("public/favicon/android-chrome-512x512.png");
        let publisher = ArtifactPublisher::new(storage.clone(), "public/favicon/");

        let result = publisher.publish(&artifacts(), "1").await;
        assert!(matches!(result, Err(AppError::Publish(_))));
    }

    #[tokio::test]
    async fn test_incomplete_set_is_rejected() {
        let storage = Arc::new(MockStorage::new());
        let publisher = ArtifactPublisher::new(storage, "public/favicon/");

        let mut partial = artifacts();
        partial.pop();
        let result = publisher.publish(&partial, "1").await;
        assert!(matches!(result, Err(AppError::Publish(_))));
    }

    #[test]
    fn test_versioned_appends_query() {
        assert_eq!(versioned("https://a/b.png", "7"), "https://a/b.png?v=7");
        assert_eq!(versioned("https://a/b.png?x=1", "7"), "https://a/b.png?x=1&v=7");
    }
}
