use std::sync::Arc;

use favicon_core::{AppError, IconTarget};
use futures::future::try_join_all;
use image::DynamicImage;

use super::resize::ImageResize;
use crate::artifact::DerivedImage;

/// Render every icon target from the shared base image.
///
/// Each target is resized on the blocking pool; the call resolves once all five
/// are done, in `IconTarget::ALL` order.
pub async fn derive_targets(base: Arc<DynamicImage>) -> Result<Vec<DerivedImage>, AppError> {
    let start = std::time::Instant::now();

    let tasks = IconTarget::ALL.into_iter().map(|target| {
        let base = Arc::clone(&base);
        async move {
            tokio::task::spawn_blocking(move || {
                DerivedImage::new(target, ImageResize::cover_fit(&base, target.size()))
            })
            .await
            .map_err(|e| AppError::Internal(format!("Resize task for {} failed: {}", target.name(), e)))
        }
    });

    let derived = try_join_all(tasks).await?;

    tracing::debug!(
        count = derived.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Derived icon targets"
    );

    Ok(derived)
}
