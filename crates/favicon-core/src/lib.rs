//! Favicon Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every crate of the favicon generation pipeline.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::FaviconConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    FaviconAsset, FaviconRecord, FaviconStatus, GeneratedFiles, IconTarget, NewFaviconRecord,
    UploadEvent,
};
pub use storage_types::StorageBackend;
