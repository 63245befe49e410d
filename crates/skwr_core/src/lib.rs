//! Skewer Core - deep image storage and file formats.
//!
//! This crate provides:
//!
//! - **Deep pixel store**: `DeepSample`, `DeepPixel`, `DeepImageBuffer`
//! - **Deep image codec**: reading and writing sparse deep scanline files
//! - **Render jobs**: request/response values exchanged with schedulers
//! - **Previews**: flattened PNG export
//!
//! # Example
//!
//! ```ignore
//! use skwr_core::deep_io::{load_deep_image, save_deep_image};
//!
//! let buffer = load_deep_image("render.deep")?;
//! println!("{} samples", buffer.total_sample_count());
//! save_deep_image(&buffer, "copy.deep")?;
//! ```

pub mod deep;
pub mod deep_io;
pub mod job;
pub mod preview;

// Re-export commonly used types
pub use deep::{DeepImageBuffer, DeepPixel, DeepSample};
pub use deep_io::{DeepImageError, DeepImageResult};
pub use job::{JobError, RenderJobRequest, RenderJobResponse};
pub use skwr_math::Spectrum;
