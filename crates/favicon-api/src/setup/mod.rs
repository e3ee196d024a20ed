//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use favicon_core::FaviconConfig;
use favicon_infra::LogFormat;
use favicon_services::{
    create_storage, CleanupService, FaviconPipeline, FaviconRecordRepository, PipelineSettings,
};

use crate::state::AppState;

/// Telemetry, database, storage, pipeline and the weekly sweep.
pub async fn initialize_app(config: FaviconConfig) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    favicon_infra::init_telemetry("favicon-api", &config.environment, LogFormat::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = favicon_db::connect(&config).await?;
    favicon_db::run_migrations(&pool).await?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let records = Arc::new(FaviconRecordRepository::new(pool.clone()));
    let pipeline = FaviconPipeline::new(
        storage.clone(),
        records,
        PipelineSettings::from(&config),
    );

    let state = AppState::new(pipeline, storage.clone())
        .with_pool(pool)
        .with_production(config.is_production());

    if config.cleanup_enabled {
        Arc::new(CleanupService::from_config(storage, &config)).start();
        tracing::info!(
            prefix = %config.cleanup_prefix,
            keep = config.cleanup_keep,
            "Weekly favicon source sweep started"
        );
    }

    let state = Arc::new(state);
    let router = routes::build_router(state.clone());

    Ok((state, router))
}
