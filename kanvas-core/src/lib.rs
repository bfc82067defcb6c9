//! # Kanvas Core
//!
//! Synchronous engine of the Kanvas infinite canvas: placed images, the
//! viewport, undo/redo, selection and crop editing.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 kanvas-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Scene           │  Input                   │
//! │  - Placed images │  - Pointer/touch/key     │
//! │  - Z-order       │  - Gesture state machine │
//! │  - Selection     │  - Viewport pan/zoom     │
//! ├─────────────────────────────────────────────┤
//! │  History         │  Crop editor             │
//! │  - Snapshots     │  - Normalized crop box   │
//! │  - Undo/redo     │  - Drag/resize/clamp     │
//! ├─────────────────────────────────────────────┤
//! │  Persistence: canvas.json + blob store      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Pixel work (crop baking, combining, masking) lives in `kanvas-compositor`;
//! this crate only produces the geometry those operations consume.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crop;
pub mod element;
pub mod error;
pub mod event;
pub mod geometry;
pub mod history;
pub mod input;
pub mod scene;
pub mod schema;
pub mod selection;
pub mod state;
pub mod store;
pub mod viewport;

pub use config::{EditorConfig, ViewportLimits};
pub use crop::{CropCommit, CropEditor, CropGrab};
pub use element::{CropBox, ImageId, ImagePatch, ImageSource, PlacedImage, PLACEHOLDER_DATA_URI};
pub use error::{CanvasError, CanvasResult};
pub use event::{Button, InputEvent, Modifiers, TouchPhase, TouchPoint, WheelDelta};
pub use geometry::{Handle, Point, Rect, Size};
pub use history::History;
pub use input::{Gesture, Intent};
pub use scene::{Scene, ZOrder};
pub use schema::{CanvasDocument, ImageDocument, SourceDocument, TransformDocument};
pub use selection::Marquee;
pub use state::CanvasState;
pub use store::{CanvasStore, SaveReport, StoreError};
pub use viewport::Viewport;
