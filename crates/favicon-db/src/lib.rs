//! Favicon record persistence
//!
//! Postgres access for the favicon rows of the `site_images` collection. The
//! [`FaviconRecordStore`] trait is the seam the reconciler depends on; the
//! Postgres implementation lives in [`db::favicon`].

pub mod db;

pub use db::{connect, run_migrations, FaviconRecordRepository, FaviconRecordStore};
