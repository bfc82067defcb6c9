//! Click and rubber-band selection.

use crate::event::Modifiers;
use crate::geometry::{Point, Rect};
use crate::scene::Scene;
use crate::ImageId;

/// A rubber-band rectangle being dragged out in canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    origin: Point,
    current: Point,
}

impl Marquee {
    /// Start a marquee at a canvas-space point.
    #[must_use]
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            current: origin,
        }
    }

    /// Move the free corner.
    pub fn update(&mut self, current: Point) {
        self.current = current;
    }

    /// The normalized rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.origin, self.current)
    }

    /// Whether the marquee is large enough on at least one axis to count.
    #[must_use]
    pub fn exceeds(&self, threshold: f64) -> bool {
        let r = self.rect();
        r.width > threshold || r.height > threshold
    }
}

/// Ids of every image whose bounding box overlaps `rect`, bottom to top.
///
/// Rotated images are tested with the axis-aligned box of their rotated
/// outline.
#[must_use]
pub fn images_in_rect(scene: &Scene, rect: &Rect) -> Vec<ImageId> {
    scene
        .images()
        .iter()
        .filter(|img| img.aabb().intersects(rect))
        .map(|img| img.id)
        .collect()
}

/// Apply a click on `id`.
///
/// With a multi-select modifier the image is toggled in or out of the
/// selection; otherwise it becomes the only selected image.
pub fn click_select(scene: &mut Scene, id: ImageId, modifiers: Modifiers) {
    if modifiers.multi_select() {
        scene.toggle_selection(id);
    } else {
        scene.select_only(id);
    }
}

/// Finish a marquee: select everything it touches.
///
/// Marquees under `threshold` on both axes are discarded and leave the
/// (already cleared) selection empty. Returns the number of images selected.
pub fn finish_marquee(scene: &mut Scene, marquee: &Marquee, threshold: f64) -> usize {
    if !marquee.exceeds(threshold) {
        return 0;
    }
    let hits = images_in_rect(scene, &marquee.rect());
    if !hits.is_empty() {
        scene.set_selection(hits);
    }
    scene.selected().len()
}
