//! Favicon Infrastructure Library
//!
//! Shared pieces for the HTTP service and the CLI:
//! - Telemetry initialization
//! - Request ID middleware
//! - HTTP error response body

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "middleware")]
pub use middleware::{request_id_middleware, REQUEST_ID_HEADER};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

pub use error::ErrorResponse;
