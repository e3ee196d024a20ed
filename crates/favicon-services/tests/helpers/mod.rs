//! Test helpers: local storage in a temp dir, in-memory record store and a
//! pipeline wired to both.
//!
//! Run from workspace root: `cargo test -p favicon-services --test pipeline_test`.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use favicon_services::test_helpers::MockRecordStore;
use favicon_services::{FaviconPipeline, PipelineSettings};
use favicon_storage::{LocalStorage, Storage, UploadOptions};
use image::{ImageFormat, Rgba, RgbaImage};
use tempfile::TempDir;

pub const BASE_URL: &str = "http://localhost:4000/files";

/// Pipeline over a throwaway storage root; temp dirs are removed on drop.
pub struct TestPipeline {
    pub pipeline: FaviconPipeline,
    pub storage: Arc<LocalStorage>,
    pub records: Arc<MockRecordStore>,
    pub storage_root: TempDir,
    pub tmp_root: TempDir,
}

impl TestPipeline {
    pub fn storage_path(&self, key: &str) -> PathBuf {
        self.storage_root.path().join(key)
    }

    /// Files currently under the pipeline's working-directory root.
    pub fn leftover_tmp_entries(&self) -> usize {
        std::fs::read_dir(self.tmp_root.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn put_source(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.storage
            .upload_with_key(key, data.into(), &UploadOptions::new(content_type))
            .await
            .unwrap();
    }
}

pub async fn setup_test_pipeline() -> TestPipeline {
    let storage_root = tempfile::tempdir().unwrap();
    let tmp_root = tempfile::tempdir().unwrap();

    let storage = Arc::new(
        LocalStorage::new(storage_root.path(), BASE_URL.to_string())
            .await
            .unwrap(),
    );
    let records = Arc::new(MockRecordStore::new());

    let pipeline = FaviconPipeline::new(
        storage.clone(),
        records.clone(),
        PipelineSettings {
            tmp_root: Some(tmp_root.path().to_path_buf()),
            ..Default::default()
        },
    );

    TestPipeline {
        pipeline,
        storage,
        records,
        storage_root,
        tmp_root,
    }
}

pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([230, 60, 20, 255]));
    // A centred square in a second colour so resizes have real content.
    for x in width / 4..width * 3 / 4 {
        for y in height / 4..height * 3 / 4 {
            img.put_pixel(x, y, Rgba([20, 60, 230, 255]));
        }
    }
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}
