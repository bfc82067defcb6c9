//! Editor error types.

use kanvas_compositor::CompositeError;
use kanvas_core::{CanvasError, StoreError};
use thiserror::Error;

use crate::collaborator::CollaboratorError;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors surfaced by editor operations.
///
/// An operation that returns one of these has left the scene exactly as it
/// found it.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Scene-level failure (missing image, bad selection).
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// Decode, geometry or encode failure.
    #[error(transparent)]
    Composite(#[from] CompositeError),

    /// The external service failed or found nothing.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EditorError {
    /// Short, user-facing description of the failure class.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Canvas(CanvasError::InvalidSelection(_)) => "Select the right images first",
            Self::Canvas(_) => "The canvas changed while this was running",
            Self::Composite(e) if e.is_decode_failure() => "An image could not be loaded",
            Self::Composite(_) => "The images could not be processed",
            Self::Collaborator(CollaboratorError::NotFound(_)) => "Nothing matching was found",
            Self::Collaborator(_) => "The image service did not respond",
            Self::Store(_) => "The canvas could not be saved",
        }
    }
}
