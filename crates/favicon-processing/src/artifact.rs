use bytes::Bytes;
use favicon_core::{AppError, FaviconAsset, IconTarget};
use image::DynamicImage;

use crate::image::ImageProcessor;

/// A rendered square derivative. Immutable once produced.
#[derive(Debug, Clone)]
pub struct DerivedImage {
    pub target: IconTarget,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub image: DynamicImage,
}

impl DerivedImage {
    pub fn new(target: IconTarget, image: DynamicImage) -> Self {
        Self {
            target,
            pixel_width: image.width(),
            pixel_height: image.height(),
            image,
        }
    }

    /// PNG-encode into the artifact published under the target's filename.
    pub fn to_artifact(&self) -> Result<IconArtifact, AppError> {
        let bytes = ImageProcessor::encode_png(&self.image)?;
        Ok(IconArtifact::new(self.target.asset(), bytes))
    }
}

/// Encoded file ready for upload.
#[derive(Debug, Clone)]
pub struct IconArtifact {
    pub asset: FaviconAsset,
    pub filename: &'static str,
    pub mime_type: &'static str,
    pub bytes: Bytes,
}

impl IconArtifact {
    pub fn new(asset: FaviconAsset, bytes: Bytes) -> Self {
        Self {
            asset,
            filename: asset.filename(),
            mime_type: asset.content_type(),
            bytes,
        }
    }
}
