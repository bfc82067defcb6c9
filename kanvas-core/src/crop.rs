//! Interactive crop-box editing.
//!
//! While an image is in crop mode its crop box is edited in display units
//! relative to the image's unrotated frame, and written back into the scene
//! after every change so renderers see it live. Committing hands the final
//! normalized box to the compositor; cancelling restores the box the image
//! had on entry.

use tracing::debug;

use crate::error::{CanvasError, CanvasResult};
use crate::geometry::{Handle, Point, Rect, Size};
use crate::scene::Scene;
use crate::{CropBox, ImageId, ImagePatch};

/// What a pointer press inside crop mode grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropGrab {
    /// The body of the crop box.
    Move,
    /// One of its resize handles.
    Handle(Handle),
}

/// A crop ready to be baked by the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropCommit {
    /// Image being cropped.
    pub id: ImageId,
    /// Final normalized crop box.
    pub crop_box: CropBox,
    /// Crop box the image had before crop mode, for the history snapshot.
    pub original: Option<CropBox>,
}

#[derive(Debug, Clone, PartialEq)]
struct CropSession {
    id: ImageId,
    display: Size,
    rotation: f64,
    rect: Rect,
    original: Option<CropBox>,
}

impl CropSession {
    fn crop_box(&self) -> CropBox {
        CropBox::from_display_rect(self.rect, self.display)
    }

    /// Rotate a canvas-space delta into the image's local frame.
    fn local_delta(&self, delta: Point) -> Point {
        if self.rotation == 0.0 {
            delta
        } else {
            delta.rotated_about(Point::default(), -self.rotation)
        }
    }
}

/// Crop mode state. At most one image is in crop mode at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropEditor {
    session: Option<CropSession>,
    min_size: f64,
}

impl CropEditor {
    /// Create an idle editor enforcing `min_size` display units per side.
    #[must_use]
    pub fn new(min_size: f64) -> Self {
        Self {
            session: None,
            min_size,
        }
    }

    /// Whether an image is in crop mode.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The image in crop mode.
    #[must_use]
    pub fn cropping_id(&self) -> Option<ImageId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Current crop box of the active session.
    #[must_use]
    pub fn crop_box(&self) -> Option<CropBox> {
        self.session.as_ref().map(CropSession::crop_box)
    }

    /// Canvas-space rectangle of the crop box (unrotated frame).
    #[must_use]
    pub fn canvas_rect(&self, scene: &Scene) -> Option<Rect> {
        let session = self.session.as_ref()?;
        let image = scene.get(session.id)?;
        Some(Rect::new(
            image.x + session.rect.x,
            image.y + session.rect.y,
            session.rect.width,
            session.rect.height,
        ))
    }

    /// Enter crop mode for `id`, starting from its current crop box.
    ///
    /// Any session for another image is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist.
    pub fn begin(&mut self, scene: &mut Scene, id: ImageId) -> CanvasResult<()> {
        if self.cropping_id() == Some(id) {
            return Ok(());
        }
        self.cancel(scene);
        let image = scene.get(id).ok_or(CanvasError::ImageNotFound(id))?;
        let display = image.size();
        if !(display.width > 0.0 && display.height > 0.0) {
            return Err(CanvasError::Geometry(format!(
                "image {id} has no displayable area"
            )));
        }
        let rect = image.effective_crop().to_display_rect(display);
        debug!(%id, "entering crop mode");
        self.session = Some(CropSession {
            id,
            display,
            rotation: image.rotation,
            rect,
            original: image.crop_box,
        });
        Ok(())
    }

    /// Find what a canvas-space press would grab. `radius` is the handle hit
    /// radius in canvas units.
    #[must_use]
    pub fn hit(&self, scene: &Scene, point: Point, radius: f64) -> Option<CropGrab> {
        let session = self.session.as_ref()?;
        let image = scene.get(session.id)?;
        let frame = image.bounds();
        let local = if session.rotation == 0.0 {
            point
        } else {
            point.rotated_about(frame.center(), -session.rotation)
        };
        let local = Point::new(local.x - frame.x, local.y - frame.y);
        if let Some(handle) = Handle::hit(&session.rect, local, radius) {
            return Some(CropGrab::Handle(handle));
        }
        session.rect.contains(local).then_some(CropGrab::Move)
    }

    /// Move the crop box by a canvas-space delta, keeping it inside the image.
    pub fn drag(&mut self, scene: &mut Scene, delta: Point) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let d = session.local_delta(delta);
        let r = &mut session.rect;
        r.x = (r.x + d.x).clamp(0.0, (session.display.width - r.width).max(0.0));
        r.y = (r.y + d.y).clamp(0.0, (session.display.height - r.height).max(0.0));
        self.sync(scene);
    }

    /// Resize the crop box by dragging `handle` by a canvas-space delta.
    ///
    /// The box keeps the minimum size (capped at the image size) and is
    /// clipped to the image.
    pub fn resize(&mut self, scene: &mut Scene, handle: Handle, delta: Point) {
        let min_size = self.min_size;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let d = session.local_delta(delta);
        let min = min_size
            .min(session.display.width)
            .min(session.display.height);
        let mut r = session.rect.resized(handle, d, min);

        if r.x < 0.0 {
            r.width += r.x;
            r.x = 0.0;
        }
        if r.y < 0.0 {
            r.height += r.y;
            r.y = 0.0;
        }
        if r.right() > session.display.width {
            r.width = session.display.width - r.x;
        }
        if r.bottom() > session.display.height {
            r.height = session.display.height - r.y;
        }
        if r.width < min {
            r.width = min;
            r.x = r.x.min(session.display.width - min);
        }
        if r.height < min {
            r.height = min;
            r.y = r.y.min(session.display.height - min);
        }

        session.rect = r;
        self.sync(scene);
    }

    /// Leave crop mode, restoring the crop box the image had on entry.
    pub fn cancel(&mut self, scene: &mut Scene) {
        if let Some(session) = self.session.take() {
            debug!(id = %session.id, "crop cancelled");
            scene.update(
                session.id,
                &ImagePatch {
                    crop_box: Some(session.original),
                    ..ImagePatch::default()
                },
            );
        }
    }

    /// Leave crop mode and return the crop to bake.
    ///
    /// The crop box stays on the image until the baked source replaces it.
    /// Returns `None` if nothing was being cropped, the image has gone, or
    /// the box still covers the whole image.
    pub fn commit(&mut self, scene: &Scene) -> Option<CropCommit> {
        let session = self.session.take()?;
        if !scene.contains(session.id) {
            return None;
        }
        let crop_box = session.crop_box();
        if crop_box == CropBox::FULL {
            return None;
        }
        Some(CropCommit {
            id: session.id,
            crop_box,
            original: session.original,
        })
    }

    /// Forget the session without touching the scene (e.g. after undo).
    pub fn abandon(&mut self) {
        self.session = None;
    }

    fn sync(&self, scene: &mut Scene) {
        if let Some(session) = &self.session {
            scene.update(
                session.id,
                &ImagePatch {
                    crop_box: Some(Some(session.crop_box())),
                    ..ImagePatch::default()
                },
            );
        }
    }
}
