//! Fixed names shared between the pipeline, the uploading client and the
//! favicon link consumer.

/// Object path prefix whose uploads trigger favicon generation.
pub const WATCH_PREFIX: &str = "siteImages/favicon_";

/// Namespace the generated icon set is published under.
pub const PUBLIC_PREFIX: &str = "public/favicon/";

/// Prefix swept by the weekly source-file cleanup.
pub const CLEANUP_PREFIX: &str = "admin/favicon/";

/// Only objects whose name contains this marker are considered by the sweep.
pub const CLEANUP_SOURCE_MARKER: &str = "source-";

/// Number of source files the sweep keeps.
pub const CLEANUP_KEEP: usize = 5;

/// Number of pending records the reconciler inspects.
pub const CANDIDATE_LIMIT: i64 = 5;

/// Edge length of the canonical square every derivative is rendered from.
pub const BASE_SIZE: u32 = 1024;

pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Object metadata key an uploading client may use to name its pending record.
pub const RECORD_ID_METADATA_KEY: &str = "favicon-record-id";

/// Value of the `type` column for favicon rows in `site_images`.
pub const FAVICON_RECORD_TYPE: &str = "favicon";
