//! The ordered collection of placed images plus the selection set.

use std::collections::HashSet;

use crate::{CanvasError, CanvasResult, ImageId, ImagePatch, PlacedImage, Point};

/// Where [`Scene::reorder`] moves images in the stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    /// To the top of the stack.
    Front,
    /// To the bottom of the stack.
    Back,
    /// One step up.
    Forward,
    /// One step down.
    Backward,
}

/// Placed images in stacking order (later entries draw on top) and the
/// current selection.
///
/// Every selected id refers to a live image; removing an image prunes it
/// from the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    images: Vec<PlacedImage>,
    selected: Vec<ImageId>,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a scene from stored parts, dropping selected ids that no
    /// longer exist.
    #[must_use]
    pub fn from_parts(images: Vec<PlacedImage>, selected: Vec<ImageId>) -> Self {
        let mut scene = Self {
            images,
            selected: Vec::new(),
        };
        scene.set_selection(selected);
        scene
    }

    /// All images, bottom to top.
    #[must_use]
    pub fn images(&self) -> &[PlacedImage] {
        &self.images
    }

    /// Get the number of images in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Look up an image.
    #[must_use]
    pub fn get(&self, id: ImageId) -> Option<&PlacedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Whether an image with this id exists.
    #[must_use]
    pub fn contains(&self, id: ImageId) -> bool {
        self.index_of(id).is_some()
    }

    /// Stacking position of an image.
    #[must_use]
    pub fn index_of(&self, id: ImageId) -> Option<usize> {
        self.images.iter().position(|img| img.id == id)
    }

    /// Add an image on top of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if an image with the same id is already present.
    pub fn add(&mut self, image: PlacedImage) -> CanvasResult<ImageId> {
        if self.contains(image.id) {
            return Err(CanvasError::DuplicateId(image.id));
        }
        let id = image.id;
        self.images.push(image);
        Ok(id)
    }

    /// Apply a partial update. Returns `false` (and does nothing) if the id
    /// is unknown.
    pub fn update(&mut self, id: ImageId, patch: &ImagePatch) -> bool {
        match self.images.iter_mut().find(|img| img.id == id) {
            Some(image) => {
                image.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Swap the image `id` for `replacement` at the same stacking position.
    ///
    /// The selection entry for `id` is dropped. Returns `false` if `id` is
    /// unknown or the replacement's id collides with another image.
    pub fn replace(&mut self, id: ImageId, replacement: PlacedImage) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        if replacement.id != id && self.contains(replacement.id) {
            return false;
        }
        self.images[index] = replacement;
        self.selected.retain(|sel| *sel != id);
        true
    }

    /// Remove images by id, returning the removed ones in stacking order.
    pub fn remove(&mut self, ids: &[ImageId]) -> Vec<PlacedImage> {
        let doomed: HashSet<ImageId> = ids.iter().copied().collect();
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.images)
            .into_iter()
            .partition(|img| doomed.contains(&img.id));
        self.images = kept;
        self.selected.retain(|id| !doomed.contains(id));
        removed
    }

    /// Move images in the stacking order.
    ///
    /// Images not named keep their relative order. Unknown ids are ignored.
    pub fn reorder(&mut self, ids: &[ImageId], position: ZOrder) {
        let moving: HashSet<ImageId> = ids.iter().copied().collect();
        let is_moving = |img: &PlacedImage| moving.contains(&img.id);

        match position {
            ZOrder::Front | ZOrder::Back => {
                let (moved, rest): (Vec<_>, Vec<_>) =
                    std::mem::take(&mut self.images).into_iter().partition(is_moving);
                self.images = if position == ZOrder::Front {
                    rest.into_iter().chain(moved).collect()
                } else {
                    moved.into_iter().chain(rest).collect()
                };
            }
            ZOrder::Forward => {
                for i in (0..self.images.len().saturating_sub(1)).rev() {
                    if is_moving(&self.images[i]) && !is_moving(&self.images[i + 1]) {
                        self.images.swap(i, i + 1);
                    }
                }
            }
            ZOrder::Backward => {
                for i in 1..self.images.len() {
                    if is_moving(&self.images[i]) && !is_moving(&self.images[i - 1]) {
                        self.images.swap(i, i - 1);
                    }
                }
            }
        }
    }

    /// Topmost image under a canvas-space point.
    #[must_use]
    pub fn image_at(&self, point: Point) -> Option<ImageId> {
        self.images
            .iter()
            .rev()
            .find(|img| img.contains_point(point))
            .map(|img| img.id)
    }

    /// Selected ids, in selection order.
    #[must_use]
    pub fn selected(&self) -> &[ImageId] {
        &self.selected
    }

    /// Check whether an image is selected.
    #[must_use]
    pub fn is_selected(&self, id: ImageId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected images, bottom to top.
    pub fn selected_in_z_order(&self) -> impl Iterator<Item = &PlacedImage> {
        self.images.iter().filter(|img| self.selected.contains(&img.id))
    }

    /// The single selected image, if exactly one is selected.
    #[must_use]
    pub fn single_selection(&self) -> Option<&PlacedImage> {
        match self.selected.as_slice() {
            [id] => self.get(*id),
            _ => None,
        }
    }

    /// Replace the selection, dropping unknown and duplicate ids.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = ImageId>) {
        self.selected.clear();
        for id in ids {
            if self.contains(id) && !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
    }

    /// Select exactly one image.
    pub fn select_only(&mut self, id: ImageId) {
        self.set_selection([id]);
    }

    /// Add or remove an image from the selection.
    pub fn toggle_selection(&mut self, id: ImageId) {
        if let Some(pos) = self.selected.iter().position(|sel| *sel == id) {
            self.selected.remove(pos);
        } else if self.contains(id) {
            self.selected.push(id);
        }
    }

    /// Select every image.
    pub fn select_all(&mut self) {
        self.selected = self.images.iter().map(|img| img.id).collect();
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}
