//! Seam to the external generation and segmentation service.
//!
//! The editor never talks to a concrete service: it holds an
//! `Arc<dyn Collaborator>` and treats every call as an opaque async request
//! that yields pixels or a typed failure.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kanvas_core::{ImageSource, Size};
use thiserror::Error;

/// Failures reported by a collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The described object is not in the image.
    #[error("No object matching \"{0}\" was found")]
    NotFound(String),

    /// The request did not finish in time.
    #[error("Request timed out")]
    Timeout,

    /// The service reported an error.
    #[error("Service error: {0}")]
    Service(String),

    /// The service answered without a usable image.
    #[error("Service returned no result")]
    NoResult,
}

/// A generated image and its native pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// The encoded result.
    pub source: ImageSource,
    /// Native pixel size of `source`.
    pub native_size: Size,
}

/// An image-to-image request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageToImageRequest {
    /// Input pixels with any crop already baked in.
    pub image: ImageSource,
    /// What to generate.
    pub prompt: String,
    /// Optional style reference.
    pub style: Option<ImageSource>,
    /// Requested output width in pixels.
    pub width: u32,
    /// Requested output height in pixels.
    pub height: u32,
}

/// One step of a streaming generation.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// An intermediate frame.
    Progress(ImageSource),
    /// The final image.
    Complete(ImageSource),
    /// The generation failed.
    Error(String),
}

impl GenerationEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}

/// External generation and segmentation service.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Return a copy of `image` with its background made transparent.
    async fn remove_background(&self, image: ImageSource) -> Result<ImageSource, CollaboratorError>;

    /// Return a luminance mask selecting the object described by
    /// `description`, or [`CollaboratorError::NotFound`].
    async fn isolate_object_mask(
        &self,
        image: ImageSource,
        description: &str,
    ) -> Result<ImageSource, CollaboratorError>;

    /// Generate an image from a text prompt.
    async fn generate_from_text(
        &self,
        prompt: &str,
        style: Option<ImageSource>,
    ) -> Result<GeneratedImage, CollaboratorError>;

    /// Start an image-to-image generation.
    ///
    /// The stream yields any number of [`GenerationEvent::Progress`] frames
    /// and then one terminal event.
    fn generate_from_image(
        &self,
        request: ImageToImageRequest,
    ) -> BoxStream<'static, GenerationEvent>;
}
