//! ICO packaging
//!
//! `favicon.ico` holds the 16px and 32px derivatives as PNG payloads:
//!
//! ```text
//! ICONDIR      reserved u16 = 0 | type u16 = 1 | count u16
//! ICONDIRENTRY width u8 | height u8 | colours u8 | reserved u8 |
//!              planes u16 | bit count u16 | byte size u32 | offset u32   (x count)
//! payloads     PNG streams at the recorded offsets
//! ```
//!
//! All fields are little-endian. A width or height byte of 0 means 256.

use bytes::Bytes;
use favicon_core::{AppError, FaviconAsset, IconTarget};
use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::ExtendedColorType;

use crate::artifact::{DerivedImage, IconArtifact};

const ICONDIR_LEN: usize = 6;
const ICONDIRENTRY_LEN: usize = 16;

/// One parsed directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconDirEntry {
    pub width: u32,
    pub height: u32,
    pub color_count: u8,
    pub planes: u16,
    pub bit_count: u16,
    pub bytes_in_res: u32,
    pub image_offset: u32,
}

/// Parsed ICONDIR of an ICO container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconDirectory {
    pub entries: Vec<IconDirEntry>,
}

impl IconDirectory {
    pub fn parse(data: &[u8]) -> Result<Self, AppError> {
        if data.len() < ICONDIR_LEN {
            return Err(AppError::Packaging("ICO shorter than its header".to_string()));
        }

        let reserved = read_u16(data, 0);
        let kind = read_u16(data, 2);
        let count = read_u16(data, 4) as usize;

        if reserved != 0 || kind != 1 {
            return Err(AppError::Packaging(format!(
                "Not an icon directory (reserved={}, type={})",
                reserved, kind
            )));
        }
        if data.len() < ICONDIR_LEN + count * ICONDIRENTRY_LEN {
            return Err(AppError::Packaging(format!(
                "ICO truncated: {} entries declared",
                count
            )));
        }

        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let at = ICONDIR_LEN + index * ICONDIRENTRY_LEN;
            let entry = IconDirEntry {
                width: dimension(data[at]),
                height: dimension(data[at + 1]),
                color_count: data[at + 2],
                planes: read_u16(data, at + 4),
                bit_count: read_u16(data, at + 6),
                bytes_in_res: read_u32(data, at + 8),
                image_offset: read_u32(data, at + 12),
            };

            let end = entry.image_offset as usize + entry.bytes_in_res as usize;
            if entry.bytes_in_res == 0 || end > data.len() {
                return Err(AppError::Packaging(format!(
                    "ICO entry {} points outside the file",
                    index
                )));
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// `(width, height)` of each entry in directory order.
    pub fn sizes(&self) -> Vec<(u32, u32)> {
        self.entries.iter().map(|e| (e.width, e.height)).collect()
    }
}

fn dimension(byte: u8) -> u32 {
    if byte == 0 {
        256
    } else {
        byte as u32
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Builds `favicon.ico` from the 16px and 32px derivatives.
pub struct IconPackager;

impl IconPackager {
    pub fn package(small: &DerivedImage, large: &DerivedImage) -> Result<IconArtifact, AppError> {
        Self::check(small, IconTarget::Favicon16)?;
        Self::check(large, IconTarget::Favicon32)?;

        let small_rgba = small.image.to_rgba8();
        let large_rgba = large.image.to_rgba8();

        let frames = vec![
            IcoFrame::as_png(
                small_rgba.as_raw(),
                small.pixel_width,
                small.pixel_height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| AppError::Packaging(format!("Failed to encode 16px frame: {}", e)))?,
            IcoFrame::as_png(
                large_rgba.as_raw(),
                large.pixel_width,
                large.pixel_height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| AppError::Packaging(format!("Failed to encode 32px frame: {}", e)))?,
        ];

        let mut buffer = Vec::new();
        IcoEncoder::new(&mut buffer)
            .encode_images(&frames)
            .map_err(|e| AppError::Packaging(format!("Failed to write ICO: {}", e)))?;

        let directory = IconDirectory::parse(&buffer)?;
        if directory.sizes() != [(16, 16), (32, 32)] {
            return Err(AppError::Packaging(format!(
                "ICO holds unexpected images: {:?}",
                directory.sizes()
            )));
        }

        tracing::debug!(size_bytes = buffer.len(), "Packaged favicon.ico");

        Ok(IconArtifact::new(FaviconAsset::Ico, Bytes::from(buffer)))
    }

    fn check(image: &DerivedImage, expected: IconTarget) -> Result<(), AppError> {
        let size = expected.size();
        if image.target != expected || image.pixel_width != size || image.pixel_height != size {
            return Err(AppError::Packaging(format!(
                "ICO needs a {}x{} {} image, got {}x{} {}",
                size,
                size,
                expected.name(),
                image.pixel_width,
                image.pixel_height,
                image.target.name()
            )));
        }
        Ok(())
    }
}
