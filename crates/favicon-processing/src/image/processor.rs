//! Image processor - decoding and encoding

use bytes::Bytes;
use favicon_core::AppError;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode an uploaded source, guessing the format from its content.
    pub fn decode(data: &[u8]) -> Result<DynamicImage, AppError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::Decode(format!("Failed to read image header: {}", e)))?;

        let format = reader.format();
        let img = reader
            .decode()
            .map_err(|e| AppError::Decode(format!("Failed to decode image: {}", e)))?;

        tracing::debug!(
            format = ?format,
            width = img.width(),
            height = img.height(),
            size_bytes = data.len(),
            "Decoded source image"
        );

        Ok(img)
    }

    pub fn encode_png(img: &DynamicImage) -> Result<Bytes, AppError> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::Packaging(format!("Failed to encode PNG: {}", e)))?;
        Ok(Bytes::from(buffer))
    }
}
