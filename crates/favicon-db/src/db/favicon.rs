use chrono::{DateTime, Utc};
use favicon_core::constants::FAVICON_RECORD_TYPE;
use favicon_core::{AppError, FaviconRecord, FaviconStatus, GeneratedFiles, NewFaviconRecord};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

/// Persistence operations the reconciler needs for favicon records.
///
/// Every method is scoped to rows with `type = 'favicon'`.
#[async_trait::async_trait]
pub trait FaviconRecordStore: Send + Sync {
    /// Up to `limit` processing records, newest first.
    async fn recent_processing(&self, limit: i64) -> Result<Vec<FaviconRecord>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<FaviconRecord>, AppError>;

    /// The record whose `generated_files` came from `source_object`, if any.
    async fn find_by_source_object(
        &self,
        source_object: &str,
    ) -> Result<Option<FaviconRecord>, AppError>;

    /// Atomically move a processing record to completed with its files.
    ///
    /// Returns `None` when the record does not exist or is no longer
    /// processing, i.e. another run claimed it first.
    async fn claim(
        &self,
        id: Uuid,
        source_object: &str,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError>;

    /// Rewrite the files of a record that already completed.
    async fn refresh(
        &self,
        id: Uuid,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError>;

    /// Insert a completed record, or update the one already keyed on the
    /// same `source_object`.
    async fn upsert_completed(&self, record: NewFaviconRecord) -> Result<FaviconRecord, AppError>;

    /// Insert a processing record as the uploading client does.
    async fn create_processing(&self, record: NewFaviconRecord) -> Result<FaviconRecord, AppError>;
}

const COLUMNS: &str = "id, status, url, source_url, filename, size, is_active, created_at, \
                       generated_at, generated_files, source_object";

#[derive(Debug, FromRow)]
struct FaviconRecordRow {
    id: Uuid,
    status: FaviconStatus,
    url: String,
    source_url: Option<String>,
    filename: Option<String>,
    size: Option<i64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    generated_at: Option<DateTime<Utc>>,
    generated_files: Option<Json<GeneratedFiles>>,
    source_object: Option<String>,
}

impl From<FaviconRecordRow> for FaviconRecord {
    fn from(row: FaviconRecordRow) -> Self {
        FaviconRecord {
            id: row.id,
            status: row.status,
            url: row.url,
            source_url: row.source_url,
            filename: row.filename,
            size: row.size,
            is_active: row.is_active,
            created_at: row.created_at,
            generated_at: row.generated_at,
            generated_files: row.generated_files.map(|Json(files)| files),
            source_object: row.source_object,
        }
    }
}

/// Postgres-backed favicon record repository
#[derive(Clone)]
pub struct FaviconRecordRepository {
    pool: PgPool,
}

impl FaviconRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FaviconRecordStore for FaviconRecordRepository {
    #[tracing::instrument(skip(self), fields(db.table = "site_images", db.operation = "select"))]
    async fn recent_processing(&self, limit: i64) -> Result<Vec<FaviconRecord>, AppError> {
        let rows = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "SELECT {COLUMNS} FROM site_images \
             WHERE type = $1 AND status = $2 \
             ORDER BY created_at DESC LIMIT $3"
        ))
        .bind(FAVICON_RECORD_TYPE)
        .bind(FaviconStatus::Processing)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FaviconRecord::from).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "site_images", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<FaviconRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "SELECT {COLUMNS} FROM site_images WHERE id = $1 AND type = $2"
        ))
        .bind(id)
        .bind(FAVICON_RECORD_TYPE)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FaviconRecord::from))
    }

    #[tracing::instrument(skip(self), fields(db.table = "site_images", db.operation = "select"))]
    async fn find_by_source_object(
        &self,
        source_object: &str,
    ) -> Result<Option<FaviconRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "SELECT {COLUMNS} FROM site_images WHERE source_object = $1 AND type = $2"
        ))
        .bind(source_object)
        .bind(FAVICON_RECORD_TYPE)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FaviconRecord::from))
    }

    #[tracing::instrument(skip(self, files), fields(db.table = "site_images", db.operation = "update", db.record_id = %id))]
    async fn claim(
        &self,
        id: Uuid,
        source_object: &str,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError> {
        // Status and files change in one statement; the status predicate makes
        // concurrent claims of the same row mutually exclusive.
        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "UPDATE site_images \
             SET status = $1, generated_files = $2, generated_at = NOW(), source_object = $3 \
             WHERE id = $4 AND type = $5 AND status = $6 \
             RETURNING {COLUMNS}"
        ))
        .bind(FaviconStatus::Completed)
        .bind(Json(files))
        .bind(source_object)
        .bind(id)
        .bind(FAVICON_RECORD_TYPE)
        .bind(FaviconStatus::Processing)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FaviconRecord::from))
    }

    #[tracing::instrument(skip(self, files), fields(db.table = "site_images", db.operation = "update", db.record_id = %id))]
    async fn refresh(
        &self,
        id: Uuid,
        files: &GeneratedFiles,
    ) -> Result<Option<FaviconRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "UPDATE site_images \
             SET generated_files = $1, generated_at = NOW() \
             WHERE id = $2 AND type = $3 AND status = $4 \
             RETURNING {COLUMNS}"
        ))
        .bind(Json(files))
        .bind(id)
        .bind(FAVICON_RECORD_TYPE)
        .bind(FaviconStatus::Completed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FaviconRecord::from))
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "site_images", db.operation = "upsert"))]
    async fn upsert_completed(&self, record: NewFaviconRecord) -> Result<FaviconRecord, AppError> {
        let files = record.generated_files.as_ref().ok_or_else(|| {
            AppError::InvalidInput("completed record requires generated files".to_string())
        })?;
        let source_object = record.source_object.as_deref().ok_or_else(|| {
            AppError::InvalidInput("completed record requires a source object".to_string())
        })?;

        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "INSERT INTO site_images \
             (type, status, url, source_url, filename, size, is_active, generated_at, generated_files, source_object) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW(), $7, $8) \
             ON CONFLICT (source_object) DO UPDATE \
             SET status = EXCLUDED.status, generated_files = EXCLUDED.generated_files, \
                 generated_at = EXCLUDED.generated_at \
             RETURNING {COLUMNS}"
        ))
        .bind(FAVICON_RECORD_TYPE)
        .bind(FaviconStatus::Completed)
        .bind(&record.url)
        .bind(&record.source_url)
        .bind(&record.filename)
        .bind(record.size)
        .bind(Json(files))
        .bind(source_object)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "site_images", db.operation = "insert"))]
    async fn create_processing(&self, record: NewFaviconRecord) -> Result<FaviconRecord, AppError> {
        let row = sqlx::query_as::<Postgres, FaviconRecordRow>(&format!(
            "INSERT INTO site_images (type, status, url, source_url, filename, size) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        ))
        .bind(FAVICON_RECORD_TYPE)
        .bind(FaviconStatus::Processing)
        .bind(&record.url)
        .bind(&record.source_url)
        .bind(&record.filename)
        .bind(record.size)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
