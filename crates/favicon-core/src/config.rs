//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured) with
//! defaults matching the storage layout the site expects.

use std::env;
use std::path::PathBuf;

use crate::constants;
use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 5;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct FaviconConfig {
    pub environment: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_public_base_url: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Pipeline configuration
    pub watch_prefix: String,
    pub public_prefix: String,
    pub base_size: u32,
    pub candidate_limit: i64,
    pub tmp_dir: Option<PathBuf>,
    // Source sweep configuration
    pub cleanup_enabled: bool,
    pub cleanup_prefix: String,
    pub cleanup_keep: usize,
}

impl FaviconConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse::<StorageBackend>()?;

        let config = FaviconConfig {
            environment,
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: parse_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            s3_bucket: optional("S3_BUCKET"),
            s3_region: optional("S3_REGION"),
            s3_endpoint: optional("S3_ENDPOINT"),
            s3_public_base_url: optional("S3_PUBLIC_BASE_URL"),
            aws_region: optional("AWS_REGION"),
            local_storage_path: optional("LOCAL_STORAGE_PATH"),
            local_storage_base_url: optional("LOCAL_STORAGE_BASE_URL"),
            watch_prefix: env::var("FAVICON_WATCH_PREFIX")
                .unwrap_or_else(|_| constants::WATCH_PREFIX.to_string()),
            public_prefix: env::var("FAVICON_PUBLIC_PREFIX")
                .unwrap_or_else(|_| constants::PUBLIC_PREFIX.to_string()),
            base_size: parse_or("FAVICON_BASE_SIZE", constants::BASE_SIZE),
            candidate_limit: parse_or("FAVICON_CANDIDATE_LIMIT", constants::CANDIDATE_LIMIT),
            tmp_dir: optional("FAVICON_TMP_DIR").map(PathBuf::from),
            cleanup_enabled: parse_or("FAVICON_CLEANUP_ENABLED", true),
            cleanup_prefix: env::var("FAVICON_CLEANUP_PREFIX")
                .unwrap_or_else(|_| constants::CLEANUP_PREFIX.to_string()),
            cleanup_keep: parse_or("FAVICON_CLEANUP_KEEP", constants::CLEANUP_KEEP),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.watch_prefix.is_empty() {
            anyhow::bail!("FAVICON_WATCH_PREFIX must not be empty");
        }
        if self.public_prefix.is_empty() || !self.public_prefix.ends_with('/') {
            anyhow::bail!("FAVICON_PUBLIC_PREFIX must be a non-empty path ending with '/'");
        }
        if self.public_prefix.starts_with(&self.watch_prefix)
            || self.watch_prefix.starts_with(&self.public_prefix)
        {
            // Published icons would re-trigger the pipeline.
            anyhow::bail!("FAVICON_PUBLIC_PREFIX must not overlap FAVICON_WATCH_PREFIX");
        }
        if self.base_size < 512 {
            anyhow::bail!("FAVICON_BASE_SIZE must be at least the largest icon (512)");
        }
        if self.candidate_limit < 1 {
            anyhow::bail!("FAVICON_CANDIDATE_LIMIT must be positive");
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET is required when STORAGE_BACKEND=s3");
                }
                if self.s3_region().is_none() {
                    anyhow::bail!("S3_REGION or AWS_REGION is required when STORAGE_BACKEND=s3");
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    anyhow::bail!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL are required when STORAGE_BACKEND=local"
                    );
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Explicit S3 region, falling back to the AWS SDK region variable.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> FaviconConfig {
        FaviconConfig {
            environment: "test".to_string(),
            server_port: 4000,
            database_url: "postgres://localhost/favicons".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 30,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_public_base_url: None,
            aws_region: None,
            local_storage_path: Some("/tmp/favicons".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            watch_prefix: constants::WATCH_PREFIX.to_string(),
            public_prefix: constants::PUBLIC_PREFIX.to_string(),
            base_size: constants::BASE_SIZE,
            candidate_limit: constants::CANDIDATE_LIMIT,
            tmp_dir: None,
            cleanup_enabled: true,
            cleanup_prefix: constants::CLEANUP_PREFIX.to_string(),
            cleanup_keep: constants::CLEANUP_KEEP,
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(local_config().validate().is_ok());
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let mut config = local_config();
        config.public_prefix = "siteImages/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_requires_bucket_and_region() {
        let mut config = local_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("site-assets".to_string());
        assert!(config.validate().is_err());

        config.aws_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.s3_region(), Some("eu-west-1"));
    }

    #[test]
    fn test_small_base_size_rejected() {
        let mut config = local_config();
        config.base_size = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_detection() {
        let mut config = local_config();
        assert!(!config.is_production());
        config.environment = "PROD".to_string();
        assert!(config.is_production());
    }
}
