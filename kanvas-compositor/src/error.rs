//! Compositor error types.

use thiserror::Error;

/// Result type for compositor operations.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Errors that can occur while loading or compositing images.
///
/// None of these leave partial state behind: compositing functions only
/// return new buffers.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Source bytes could not be decoded into pixels.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Source bytes could not be obtained (network, file, malformed URI).
    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    /// Requested output has zero or negative area.
    #[error("Degenerate geometry: {0}")]
    Geometry(String),

    /// Pixels could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The inputs do not describe a valid operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CompositeError {
    /// Whether this is a decode-class failure (the source could not become pixels).
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Fetch(_))
    }
}
