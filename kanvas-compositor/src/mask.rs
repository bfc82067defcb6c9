//! Cutting an object out of an image with a luminance mask.

use image::{imageops, imageops::FilterType, RgbaImage};

use crate::error::{CompositeError, CompositeResult};

/// Apply a luminance mask to `original`.
///
/// The output keeps the original's RGB channels and takes its alpha from the
/// mask's luminance (white is opaque, black is transparent). A mask of a
/// different size is resampled to the original's dimensions first.
///
/// # Errors
///
/// Returns [`CompositeError::Geometry`] if either buffer is empty.
pub fn apply_mask(original: &RgbaImage, mask: &RgbaImage) -> CompositeResult<RgbaImage> {
    let (width, height) = original.dimensions();
    if width == 0 || height == 0 || mask.width() == 0 || mask.height() == 0 {
        return Err(CompositeError::Geometry(format!(
            "Cannot mask {width}x{height} image with {}x{} mask",
            mask.width(),
            mask.height()
        )));
    }

    let luma = if mask.dimensions() == (width, height) {
        imageops::grayscale(mask)
    } else {
        tracing::debug!(
            from_width = mask.width(),
            from_height = mask.height(),
            width,
            height,
            "resampling mask"
        );
        imageops::grayscale(&imageops::resize(mask, width, height, FilterType::Triangle))
    };

    let mut out = original.clone();
    for (pixel, coverage) in out.pixels_mut().zip(luma.pixels()) {
        pixel[3] = coverage[0];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn test_alpha_follows_mask_luminance() {
        let original = RgbaImage::from_pixel(2, 2, RED);
        let mut mask = RgbaImage::new(2, 2);
        mask.put_pixel(0, 0, WHITE);
        mask.put_pixel(1, 0, WHITE);
        mask.put_pixel(0, 1, BLACK);
        mask.put_pixel(1, 1, BLACK);

        let out = apply_mask(&original, &mask).expect("mask");
        let alphas: Vec<u8> = out.pixels().map(|p| p[3]).collect();
        assert_eq!(alphas, vec![255, 255, 0, 0]);
        assert!(out.pixels().all(|p| p[0] == 255 && p[1] == 0 && p[2] == 0));
    }

    #[test]
    fn test_mismatched_mask_is_resized() {
        let original = RgbaImage::from_pixel(8, 4, RED);
        let mask = RgbaImage::from_pixel(2, 1, WHITE);
        let out = apply_mask(&original, &mask).expect("mask");
        assert_eq!(out.dimensions(), (8, 4));
        assert!(out.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_empty_mask_fails() {
        let original = RgbaImage::from_pixel(2, 2, RED);
        let err = apply_mask(&original, &RgbaImage::new(0, 0)).expect_err("empty");
        assert!(matches!(err, CompositeError::Geometry(_)));
    }
}
