//! Image processing module
//!
//! - Decoding and PNG encoding (processor)
//! - Cover-fit resizing and base normalisation (resize)
//! - Concurrent rendering of the icon targets (derive)

pub mod derive;
pub mod processor;
pub mod resize;

pub use derive::derive_targets;
pub use processor::ImageProcessor;
pub use resize::ImageResize;
