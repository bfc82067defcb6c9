//! Baking a normalized crop box into native-resolution pixels.

use image::{imageops, RgbaImage};
use kanvas_core::CropBox;

use crate::error::{CompositeError, CompositeResult};

/// Pixel rectangle `(x, y, width, height)` a crop box covers in a buffer of
/// the given native size, clamped to the buffer.
#[must_use]
pub fn crop_pixels(
    crop_box: &CropBox,
    native_width: u32,
    native_height: u32,
) -> (u32, u32, u32, u32) {
    let w = f64::from(native_width);
    let h = f64::from(native_height);
    let px = to_pixels(crop_box.x * w).min(native_width);
    let py = to_pixels(crop_box.y * h).min(native_height);
    let pw = to_pixels(crop_box.width * w).min(native_width - px);
    let ph = to_pixels(crop_box.height * h).min(native_height - py);
    (px, py, pw, ph)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_pixels(v: f64) -> u32 {
    v.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Copy the sub-rectangle a crop box covers out of `source`, 1:1.
///
/// # Errors
///
/// Returns [`CompositeError::Geometry`] if the box covers no whole pixel.
pub fn extract_crop(source: &RgbaImage, crop_box: &CropBox) -> CompositeResult<RgbaImage> {
    let (x, y, width, height) = crop_pixels(crop_box, source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(CompositeError::Geometry(format!(
            "Crop box {crop_box:?} covers {width}x{height} pixels of a {}x{} source",
            source.width(),
            source.height()
        )));
    }
    tracing::debug!(x, y, width, height, "extracting crop");
    Ok(imageops::crop_imm(source, x, y, width, height).to_image())
}

/// Extract the crop of `source` if it has one, otherwise return a copy.
///
/// # Errors
///
/// Returns [`CompositeError::Geometry`] if the box covers no whole pixel.
pub fn bake(source: &RgbaImage, crop_box: Option<&CropBox>) -> CompositeResult<RgbaImage> {
    match crop_box {
        Some(crop_box) if *crop_box != CropBox::FULL => extract_crop(source, crop_box),
        _ => Ok(source.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        #[allow(clippy::cast_possible_truncation)]
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn test_quarter_inset_crop_of_200_square() {
        let source = gradient(200, 200);
        let crop_box = CropBox::new(0.25, 0.25, 0.5, 0.5).expect("valid");
        let out = extract_crop(&source, &crop_box).expect("crop");
        assert_eq!(out.dimensions(), (100, 100));
        // Copied 1:1 from (50, 50).
        assert_eq!(out.get_pixel(0, 0), &Rgba([50, 50, 0, 255]));
        assert_eq!(out.get_pixel(99, 99), &Rgba([149, 149, 0, 255]));
    }

    #[test]
    fn test_crop_pixels_rounds_and_clamps() {
        let crop_box = CropBox::new(0.333, 0.0, 0.667, 1.0).expect("valid");
        let (x, y, w, h) = crop_pixels(&crop_box, 10, 10);
        assert_eq!((x, y), (3, 0));
        assert_eq!(w, 7);
        assert_eq!(h, 10);
    }

    #[test]
    fn test_degenerate_crop_fails() {
        let source = gradient(10, 10);
        let crop_box = CropBox::new(0.0, 0.0, 0.01, 1.0).expect("valid");
        let err = extract_crop(&source, &crop_box).expect_err("zero width");
        assert!(matches!(err, CompositeError::Geometry(_)));
    }

    #[test]
    fn test_bake_without_crop_copies() {
        let source = gradient(4, 3);
        let out = bake(&source, None).expect("bake");
        assert_eq!(out, source);
        let full = bake(&source, Some(&CropBox::FULL)).expect("bake");
        assert_eq!(full, source);
    }
}
