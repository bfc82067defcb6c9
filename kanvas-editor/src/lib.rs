//! # Kanvas Editor
//!
//! The controller that owns a Kanvas canvas. It combines the synchronous
//! engine in `kanvas-core` with the raster work in `kanvas-compositor` and an
//! external [`Collaborator`] for generation and segmentation.
//!
//! ## Ownership
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Editor                    │
//! ├──────────────────────┬──────────────────────┤
//! │  CanvasState         │  EditorContext       │
//! │  - Scene             │  - ImageCache        │
//! │  - Viewport          │  - SourceLoader      │
//! │  - History           │  - Generations       │
//! │  - Crop editor       │  - Collaborator      │
//! │                      │  - CanvasStore       │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! There is exactly one mutator. Async operations compute first and mutate
//! last, and streaming generations resolve their placeholder by id.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collaborator;
pub mod editor;
pub mod error;
pub mod generation;

pub use collaborator::{
    Collaborator, CollaboratorError, GeneratedImage, GenerationEvent, ImageToImageRequest,
};
pub use editor::{Editor, EditorContext};
pub use error::{EditorError, EditorResult};
pub use generation::{GenerationConfig, GenerationDispatcher};
