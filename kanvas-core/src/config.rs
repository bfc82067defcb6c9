//! Policy constants for interactive editing.
//!
//! None of these values are protocol requirements; they are defaults that a
//! host application may override.

use serde::{Deserialize, Serialize};

/// Zoom limits and input step sizes for the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportLimits {
    /// Smallest allowed scale.
    pub min_scale: f64,
    /// Largest allowed scale.
    pub max_scale: f64,
    /// Zoom multiplier per wheel step.
    pub wheel_step: f64,
    /// Upper bound on wheel steps applied from a single event.
    pub max_wheel_steps: f64,
    /// Zoom multiplier for keyboard zoom in/out.
    pub keyboard_factor: f64,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            wheel_step: 1.01,
            max_wheel_steps: 10.0,
            keyboard_factor: 1.2,
        }
    }
}

impl ViewportLimits {
    /// Clamp a scale into the allowed range.
    #[must_use]
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

/// Editing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Viewport limits.
    pub viewport: ViewportLimits,
    /// Minimum display size of an image during interactive resize.
    pub min_image_size: f64,
    /// Minimum crop box size in display units.
    pub min_crop_size: f64,
    /// Marquees smaller than this on both axes are treated as a click.
    pub marquee_threshold: f64,
    /// Upper bound on the native-to-display scale used by combine.
    pub combine_scale_cap: f64,
    /// Upper bound on the pixel count of a combined image.
    pub combine_max_pixels: u64,
    /// Offset applied to duplicated images.
    pub duplicate_offset: f64,
    /// Longest side of an imported image's initial display size.
    pub import_max_size: f64,
    /// Longest side of a text-to-image result's display size.
    pub generated_max_size: f64,
    /// Base dimension of image-to-image output.
    pub generation_base_size: f64,
    /// Horizontal gap between a source image and its generation placeholder.
    pub generation_gap: f64,
    /// Hit radius of resize and crop handles, in screen pixels.
    pub handle_radius: f64,
    /// Number of history snapshots retained.
    pub history_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportLimits::default(),
            min_image_size: 5.0,
            min_crop_size: 20.0,
            marquee_threshold: 5.0,
            combine_scale_cap: 4.0,
            combine_max_pixels: 64 * 1024 * 1024,
            duplicate_offset: 20.0,
            import_max_size: 300.0,
            generated_max_size: 512.0,
            generation_base_size: 512.0,
            generation_gap: 20.0,
            handle_radius: 8.0,
            history_depth: 100,
        }
    }
}
