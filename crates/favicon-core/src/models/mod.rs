//! Domain models
//!
//! - `upload_event`: the storage finalize notification that starts a run
//! - `favicon`: icon targets, published assets and the persisted favicon record

pub mod favicon;
pub mod upload_event;

pub use favicon::{
    FaviconAsset, FaviconRecord, FaviconStatus, GeneratedFiles, IconTarget, NewFaviconRecord,
};
pub use upload_event::UploadEvent;
