//! Placed images - the entities that make up a canvas scene.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CanvasError, CanvasResult};
use crate::geometry::{Point, Rect, Size};

/// A 1x1 transparent GIF used as the source of a placeholder entity.
pub const PLACEHOLDER_DATA_URI: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Unique identifier for a placed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Create a new unique image ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the raster data behind a placed image.
///
/// Cloning is cheap: embedded bytes are shared.
#[derive(Clone)]
pub enum ImageSource {
    /// A `data:` URI, an `http(s)://` URL or a local file path.
    Uri(String),
    /// Encoded image bytes (PNG, JPEG, ...) held in memory.
    Encoded {
        /// Stable key identifying these bytes.
        key: Uuid,
        /// The encoded bytes.
        bytes: Arc<[u8]>,
    },
}

impl ImageSource {
    /// Wrap freshly produced encoded bytes under a new key.
    #[must_use]
    pub fn encoded(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Encoded {
            key: Uuid::new_v4(),
            bytes: bytes.into(),
        }
    }

    /// Reference a URI or file path.
    #[must_use]
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri(uri.into())
    }

    /// Transparent stand-in used while a generation is in flight.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::Uri(PLACEHOLDER_DATA_URI.to_string())
    }

    /// Key used by the decoded-image cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::Uri(uri) => uri.clone(),
            Self::Encoded { key, .. } => format!("encoded:{key}"),
        }
    }

    /// Whether this is the placeholder source.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Uri(uri) if uri == PLACEHOLDER_DATA_URI)
    }
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Uri(a), Self::Uri(b)) => a == b,
            (Self::Encoded { key: a, .. }, Self::Encoded { key: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uri(uri) if uri.starts_with("data:") => {
                let head: String = uri.chars().take(32).collect();
                write!(f, "Uri({head}... {} bytes)", uri.len())
            }
            Self::Uri(uri) => write!(f, "Uri({uri})"),
            Self::Encoded { key, bytes } => write!(f, "Encoded({key}, {} bytes)", bytes.len()),
        }
    }
}

/// Normalized sub-rectangle of a source's native pixels.
///
/// All fields are fractions in `[0, 1]`; `x + width <= 1` and `y + height <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    /// Left edge as a fraction of native width.
    pub x: f64,
    /// Top edge as a fraction of native height.
    pub y: f64,
    /// Width as a fraction of native width.
    pub width: f64,
    /// Height as a fraction of native height.
    pub height: f64,
}

impl CropBox {
    /// The whole image.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    const TOLERANCE: f64 = 1e-9;

    /// Create a crop box, rejecting boxes outside the unit square or without area.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Geometry`] if the box is degenerate or out of range.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> CanvasResult<Self> {
        let cb = Self {
            x,
            y,
            width,
            height,
        };
        if cb.is_valid() {
            Ok(cb)
        } else {
            Err(CanvasError::Geometry(format!(
                "crop box {x},{y} {width}x{height} is outside the unit square"
            )))
        }
    }

    /// Check the unit-square invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + Self::TOLERANCE
            && self.y + self.height <= 1.0 + Self::TOLERANCE
    }

    /// Build a crop box from a rectangle expressed in display units of a
    /// `display` sized image.
    #[must_use]
    pub fn from_display_rect(rect: Rect, display: Size) -> Self {
        Self {
            x: (rect.x / display.width).clamp(0.0, 1.0),
            y: (rect.y / display.height).clamp(0.0, 1.0),
            width: (rect.width / display.width).clamp(0.0, 1.0),
            height: (rect.height / display.height).clamp(0.0, 1.0),
        }
    }

    /// The box as a rectangle in display units of a `display` sized image.
    #[must_use]
    pub fn to_display_rect(&self, display: Size) -> Rect {
        Rect::new(
            self.x * display.width,
            self.y * display.height,
            self.width * display.width,
            self.height * display.height,
        )
    }
}

impl Default for CropBox {
    fn default() -> Self {
        Self::FULL
    }
}

/// A raster image positioned on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// Stable identifier.
    pub id: ImageId,
    /// Pixel data reference.
    pub source: ImageSource,
    /// Left edge in canvas space.
    pub x: f64,
    /// Top edge in canvas space.
    pub y: f64,
    /// Display width in canvas space.
    pub width: f64,
    /// Display height in canvas space.
    pub height: f64,
    /// Rotation in degrees about the center.
    pub rotation: f64,
    /// Active crop, `None` for the full image.
    pub crop_box: Option<CropBox>,
    /// Pixels are still streaming in from a generation.
    pub is_generated: bool,
    /// Generation request this placeholder belongs to.
    pub parent_group_id: Option<Uuid>,
}

impl PlacedImage {
    /// Create an unrotated, uncropped image.
    #[must_use]
    pub fn new(source: ImageSource, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: ImageId::new(),
            source,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            crop_box: None,
            is_generated: false,
            parent_group_id: None,
        }
    }

    /// Set a specific ID.
    #[must_use]
    pub fn with_id(mut self, id: ImageId) -> Self {
        self.id = id;
        self
    }

    /// Set rotation in degrees.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the crop box.
    #[must_use]
    pub fn with_crop(mut self, crop_box: CropBox) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    /// Unrotated display rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Axis-aligned bounding box including rotation.
    #[must_use]
    pub fn aabb(&self) -> Rect {
        self.bounds().rotated_bounds(self.rotation)
    }

    /// The crop box in effect, defaulting to the full image.
    #[must_use]
    pub fn effective_crop(&self) -> CropBox {
        self.crop_box.unwrap_or(CropBox::FULL)
    }

    /// Display size of the full, uncropped frame.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Canvas-space rectangle of the visible (cropped) part of the image.
    ///
    /// This is also the geometry the image takes once its crop is baked.
    #[must_use]
    pub fn visible_rect(&self) -> Rect {
        match self.crop_box {
            Some(cb) => {
                let local = cb.to_display_rect(self.size());
                Rect::new(self.x + local.x, self.y + local.y, local.width, local.height)
            }
            None => self.bounds(),
        }
    }

    /// Hit-test a canvas-space point against the rotated image.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        let bounds = self.bounds();
        let local = if self.rotation == 0.0 {
            p
        } else {
            p.rotated_about(bounds.center(), -self.rotation)
        };
        bounds.contains(local)
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: &ImagePatch) {
        if let Some(source) = &patch.source {
            self.source = source.clone();
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(crop_box) = patch.crop_box {
            self.crop_box = crop_box;
        }
        if let Some(is_generated) = patch.is_generated {
            self.is_generated = is_generated;
        }
    }
}

/// Partial attribute update for [`PlacedImage`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagePatch {
    /// New source.
    pub source: Option<ImageSource>,
    /// New x.
    pub x: Option<f64>,
    /// New y.
    pub y: Option<f64>,
    /// New width.
    pub width: Option<f64>,
    /// New height.
    pub height: Option<f64>,
    /// New rotation.
    pub rotation: Option<f64>,
    /// `Some(None)` clears the crop box.
    pub crop_box: Option<Option<CropBox>>,
    /// New generation flag.
    pub is_generated: Option<bool>,
}

impl ImagePatch {
    /// Patch that moves an image.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that sets the full display rectangle.
    #[must_use]
    pub fn rect(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Self::default()
        }
    }

    /// Patch that swaps the source and clears any crop.
    #[must_use]
    pub fn replace_source(source: ImageSource) -> Self {
        Self {
            source: Some(source),
            crop_box: Some(None),
            ..Self::default()
        }
    }
}
