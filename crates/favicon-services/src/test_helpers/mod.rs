//! Test helpers
//!
//! In-memory `Storage` and `FaviconRecordStore` implementations plus record
//! fixtures, so services can be exercised without a bucket or a database.

pub mod mock_repository;
pub mod mock_storage;

pub use mock_repository::MockRecordStore;
pub use mock_storage::{MockStorage, StoredObject};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use favicon_core::{FaviconAsset, FaviconRecord, FaviconStatus, GeneratedFiles};
use uuid::Uuid;

/// A pending record as the uploading client writes it.
pub fn processing_record(url: &str, created_at: DateTime<Utc>) -> FaviconRecord {
    FaviconRecord {
        id: Uuid::new_v4(),
        status: FaviconStatus::Processing,
        url: url.to_string(),
        source_url: None,
        filename: url.rsplit('/').next().map(String::from),
        size: None,
        is_active: false,
        created_at,
        generated_at: None,
        generated_files: None,
        source_object: None,
    }
}

/// A complete URL set under `https://storage.test/public/favicon/`.
pub fn generated_files() -> GeneratedFiles {
    let urls: BTreeMap<FaviconAsset, String> = FaviconAsset::ALL
        .into_iter()
        .map(|asset| {
            (
                asset,
                format!("https://storage.test/public/favicon/{}?v=1", asset.filename()),
            )
        })
        .collect();
    GeneratedFiles::try_from(urls).expect("fixture set is complete")
}
