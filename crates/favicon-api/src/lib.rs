//! Favicon API Library
//!
//! HTTP entry point for the favicon pipeline: the storage finalize webhook,
//! health checks and application setup.

pub mod error;
mod handlers;
pub mod setup;
pub mod state;

pub use error::HttpAppError;
pub use setup::routes::build_router;
pub use state::AppState;
