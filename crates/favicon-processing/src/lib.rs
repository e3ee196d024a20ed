//! Favicon image processing
//!
//! Decoding, cover-fit normalisation to the base image, per-target derivation
//! and ICO packaging. Everything here is CPU-bound; async entry points move the
//! work onto the blocking pool.

pub mod artifact;
pub mod icon;
pub mod image;

pub use artifact::{DerivedImage, IconArtifact};
pub use icon::{IconDirEntry, IconDirectory, IconPackager};
pub use self::image::{derive_targets, ImageProcessor, ImageResize};
