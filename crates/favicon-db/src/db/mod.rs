//! Database repositories and pool setup
//
// Favicon records (site_images rows with type = 'favicon')
pub mod favicon;
//
// Pool construction and migrations
pub mod pool;

pub use favicon::{FaviconRecordRepository, FaviconRecordStore};
pub use pool::{connect, run_migrations};
