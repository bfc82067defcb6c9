//! Serialized representation of a canvas, as written by [`crate::store`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CropBox, ImageId, ImageSource, PlacedImage, Scene, Viewport};

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Where an image's pixels are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceDocument {
    /// A URI or file path, stored verbatim.
    Uri {
        /// The URI.
        uri: String,
    },
    /// Encoded bytes kept in the blob store under the image's id.
    Blob,
}

/// Position, size, rotation and crop of an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDocument {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Active crop box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_box: Option<CropBox>,
}

/// Document-friendly image description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDocument {
    /// Image identifier.
    pub id: String,
    /// Pixel source.
    pub source: SourceDocument,
    /// Placement.
    pub transform: TransformDocument,
    /// Stacking position (0 = bottom).
    pub z_index: usize,
}

impl ImageDocument {
    /// Convert to a runtime image. `blob` supplies the bytes for
    /// [`SourceDocument::Blob`] sources.
    ///
    /// # Errors
    ///
    /// Returns an error string if the id is not a UUID or a blob is missing.
    pub fn into_image(self, blob: Option<Arc<[u8]>>) -> Result<PlacedImage, String> {
        let uuid = Uuid::parse_str(&self.id).map_err(|e| format!("invalid id {}: {e}", self.id))?;
        let source = match self.source {
            SourceDocument::Uri { uri } => ImageSource::Uri(uri),
            SourceDocument::Blob => {
                let bytes = blob.ok_or_else(|| format!("missing blob for image {}", self.id))?;
                ImageSource::encoded(bytes)
            }
        };
        let t = self.transform;
        let mut image = PlacedImage::new(source, t.x, t.y, t.width, t.height)
            .with_id(ImageId::from_uuid(uuid))
            .with_rotation(t.rotation);
        image.crop_box = t.crop_box.filter(CropBox::is_valid);
        Ok(image)
    }
}

/// A saved canvas: images and viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Format version.
    #[serde(default = "CanvasDocument::default_version")]
    pub version: u32,
    /// Images in any order; `z_index` defines stacking.
    #[serde(default)]
    pub images: Vec<ImageDocument>,
    /// Camera.
    #[serde(default)]
    pub viewport: Viewport,
    /// Unix milliseconds of the save.
    #[serde(default)]
    pub last_modified: u64,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            images: Vec::new(),
            viewport: Viewport::default(),
            last_modified: 0,
        }
    }
}

/// Encoded bytes that must be written to the blob store.
#[derive(Debug, Clone)]
pub struct PendingBlob {
    /// Image the bytes belong to.
    pub id: ImageId,
    /// Source key, used to skip rewriting unchanged blobs.
    pub key: Uuid,
    /// Encoded bytes.
    pub bytes: Arc<[u8]>,
}

impl CanvasDocument {
    const fn default_version() -> u32 {
        DOCUMENT_VERSION
    }

    /// Build a document from a scene.
    ///
    /// Images still streaming from a generation are left out. Encoded
    /// sources are returned separately so the caller can store their bytes.
    #[must_use]
    pub fn from_scene(
        scene: &Scene,
        viewport: Viewport,
        last_modified: u64,
    ) -> (Self, Vec<PendingBlob>) {
        let mut blobs = Vec::new();
        let images = scene
            .images()
            .iter()
            .filter(|img| !img.is_generated)
            .enumerate()
            .map(|(z_index, img)| {
                let source = match &img.source {
                    ImageSource::Uri(uri) => SourceDocument::Uri { uri: uri.clone() },
                    ImageSource::Encoded { key, bytes } => {
                        blobs.push(PendingBlob {
                            id: img.id,
                            key: *key,
                            bytes: Arc::clone(bytes),
                        });
                        SourceDocument::Blob
                    }
                };
                ImageDocument {
                    id: img.id.to_string(),
                    source,
                    transform: TransformDocument {
                        x: img.x,
                        y: img.y,
                        width: img.width,
                        height: img.height,
                        rotation: img.rotation,
                        crop_box: img.crop_box,
                    },
                    z_index,
                }
            })
            .collect();
        (
            Self {
                version: DOCUMENT_VERSION,
                images,
                viewport,
                last_modified,
            },
            blobs,
        )
    }

    /// Rebuild a scene. Images that cannot be restored are skipped with a
    /// warning.
    #[must_use]
    pub fn into_scene(self, mut blobs: HashMap<String, Arc<[u8]>>) -> (Scene, Viewport) {
        let mut docs = self.images;
        docs.sort_by_key(|d| d.z_index);
        let mut scene = Scene::new();
        for doc in docs {
            let id = doc.id.clone();
            let blob = blobs.remove(&id);
            match doc.into_image(blob) {
                Ok(image) => {
                    if let Err(e) = scene.add(image) {
                        tracing::warn!("Skipping image {id}: {e}");
                    }
                }
                Err(e) => tracing::warn!("Skipping image {id}: {e}"),
            }
        }
        (scene, self.viewport)
    }
}
