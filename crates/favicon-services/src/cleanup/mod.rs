//! Weekly sweep of uploaded favicon source files

pub mod schedule;
pub mod service;

pub use schedule::WeeklySchedule;
pub use service::{select_stale, CleanupService, SweepReport};
