//! Error types for canvas operations.

use thiserror::Error;

use crate::ImageId;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Image not found in scene.
    #[error("Image not found: {0}")]
    ImageNotFound(ImageId),

    /// An image with this id already exists.
    #[error("Duplicate image id: {0}")]
    DuplicateId(ImageId),

    /// The operation needs a different selection.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Resulting geometry has zero or negative area.
    #[error("Degenerate geometry: {0}")]
    Geometry(String),
}
