//! Application state shared by all handlers.

use std::sync::Arc;

use favicon_services::{FaviconPipeline, Storage};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FaviconPipeline>,
    pub storage: Arc<dyn Storage>,
    /// `None` when the record store is not Postgres-backed (tests).
    pub pool: Option<PgPool>,
    /// Hides error details from response bodies.
    pub is_production: bool,
}

impl AppState {
    pub fn new(pipeline: FaviconPipeline, storage: Arc<dyn Storage>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            storage,
            pool: None,
            is_production: false,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_production(mut self, is_production: bool) -> Self {
        self.is_production = is_production;
        self
    }
}
