//! # Kanvas Compositor
//!
//! Raster side of the Kanvas canvas: turns image sources into pixels and
//! produces new pixels from placed images.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │ ImageSource  │──▶│ SourceLoader │──▶│ ImageCache (read-through)│
//! │ uri / bytes  │   │ fetch+decode │   └────────────┬─────────────┘
//! └──────────────┘   └──────────────┘                │ RgbaImage
//!                                     ┌──────────────┼──────────────┐
//!                                     ▼              ▼              ▼
//!                               extract_crop      combine       apply_mask
//! ```
//!
//! Every algorithm is a pure function from buffers to a new buffer. None of
//! them touch the scene; the editor decides what to do with the result.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod combine;
pub mod crop;
pub mod error;
pub mod image;
pub mod loader;
pub mod mask;

pub use cache::{CacheConfig, CacheStats, ImageCache};
pub use combine::{
    combine, optimal_scale, Combined, Layer, DEFAULT_MAX_OUTPUT_PIXELS, DEFAULT_SCALE_CAP,
};
pub use crop::{bake, crop_pixels, extract_crop};
pub use error::{CompositeError, CompositeResult};
pub use image::{decode, encode_png, native_size, parse_data_uri, to_source, ImageFormat};
pub use loader::{LoaderConfig, SourceLoader};
pub use mask::apply_mask;
