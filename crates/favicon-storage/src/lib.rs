//! Favicon Storage Library
//!
//! Storage abstraction and implementations (S3 via `object_store`, local
//! filesystem) used to read uploaded sources, publish generated icons and sweep
//! old source files.
//!
//! # Storage key format
//!
//! Keys are bucket-relative object paths such as `siteImages/favicon_1700000000000.png`
//! or `public/favicon/favicon.ico`. Keys must not contain `..` or a leading `/`;
//! the `keys` module centralises validation and published-key layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use favicon_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectInfo, Storage, StorageError, StorageResult, UploadOptions};
