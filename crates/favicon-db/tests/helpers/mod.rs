//! Test helpers: an isolated Postgres with the favicon migrations applied.
//!
//! Requires Docker for testcontainers. When the daemon cannot be reached the
//! helper returns `None` and the calling test returns early.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use favicon_core::{FaviconAsset, GeneratedFiles, NewFaviconRecord};
use favicon_db::{FaviconRecordRepository, FaviconRecordStore};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

pub struct TestDb {
    pub pool: PgPool,
    pub repo: FaviconRecordRepository,
    _container: ContainerAsync<Postgres>,
}

pub async fn setup_test_db() -> Option<TestDb> {
    let container = match Postgres::default().with_tag("16-alpine").start().await {
        Ok(container) => container,
        Err(e) => {
            eprintln!("skipping Postgres test, Docker unavailable: {}", e);
            return None;
        }
    };

    let host = container
        .get_host()
        .await
        .expect("Failed to resolve container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to resolve Postgres port");
    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&connection_string)
        .await
        .expect("Failed to connect to test database");

    favicon_db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(TestDb {
        repo: FaviconRecordRepository::new(pool.clone()),
        pool,
        _container: container,
    })
}

impl TestDb {
    /// Insert a processing record created `minutes_ago` minutes in the past.
    pub async fn pending(&self, url: &str, minutes_ago: i64) -> Uuid {
        let record = self
            .repo
            .create_processing(NewFaviconRecord::processing(url, None, Some(1024)))
            .await
            .expect("Failed to insert processing record");

        sqlx::query("UPDATE site_images SET created_at = NOW() - make_interval(mins => $1) WHERE id = $2")
            .bind(i32::try_from(minutes_ago).expect("minutes fit in i32"))
            .bind(record.id)
            .execute(&self.pool)
            .await
            .expect("Failed to age record");

        record.id
    }

    pub async fn count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM site_images")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count records")
    }
}

/// A complete URL set stamped with `version`.
pub fn generated_files(version: u32) -> GeneratedFiles {
    let urls: BTreeMap<FaviconAsset, String> = FaviconAsset::ALL
        .into_iter()
        .map(|asset| {
            (
                asset,
                format!(
                    "https://storage.test/public/favicon/{}?v={}",
                    asset.filename(),
                    version
                ),
            )
        })
        .collect();
    GeneratedFiles::try_from(urls).expect("fixture set is complete")
}

pub fn completed(source_object: &str, version: u32) -> NewFaviconRecord {
    let url = format!("https://storage.test/{}", source_object);
    NewFaviconRecord {
        status: favicon_core::FaviconStatus::Completed,
        url: url.clone(),
        source_url: Some(url),
        filename: source_object.rsplit('/').next().map(String::from),
        size: Some(2048),
        generated_files: Some(generated_files(version)),
        source_object: Some(source_object.to_string()),
    }
}

pub fn is_recent(at: Option<DateTime<Utc>>) -> bool {
    at.is_some_and(|t| (Utc::now() - t).num_minutes().abs() < 5)
}
