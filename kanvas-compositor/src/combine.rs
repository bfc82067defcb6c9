//! Flattening several placed images into one raster.
//!
//! The output covers the union of the layers' visible rectangles (after
//! rotation) at a single resolution chosen so the sharpest layer keeps as
//! much detail as the cap allows. A cropped layer still turns about the
//! center of its full frame, as it does on the canvas.

use image::{imageops, imageops::FilterType, Pixel, RgbaImage};
use kanvas_core::{PlacedImage, Point, Rect};

use crate::crop::{bake, crop_pixels};
use crate::error::{CompositeError, CompositeResult};

/// Default upper bound on the output resolution multiplier.
pub const DEFAULT_SCALE_CAP: f64 = 4.0;

/// Default upper bound on output pixels (64 MP, 256 MiB of RGBA).
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

/// One input to [`combine`]: a placed image and its decoded native pixels.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    /// Placement on the canvas.
    pub image: &'a PlacedImage,
    /// Decoded native-resolution pixels of `image.source`.
    pub pixels: &'a RgbaImage,
}

impl<'a> Layer<'a> {
    /// Pair a placed image with its decoded pixels.
    #[must_use]
    pub fn new(image: &'a PlacedImage, pixels: &'a RgbaImage) -> Self {
        Self { image, pixels }
    }

    /// Native pixels per canvas unit of the visible part of this layer.
    #[must_use]
    pub fn scale_factor(&self) -> f64 {
        let visible = self.image.visible_rect();
        let (_, _, pw, ph) = crop_pixels(
            &self.image.effective_crop(),
            self.pixels.width(),
            self.pixels.height(),
        );
        if !visible.has_area() {
            return 1.0;
        }
        (f64::from(pw) / visible.width).min(f64::from(ph) / visible.height)
    }

    /// Canvas-space footprint of the visible part after rotation.
    #[must_use]
    pub fn footprint(&self) -> Rect {
        self.image
            .visible_rect()
            .rotated_bounds_about(self.pivot(), self.image.rotation)
    }

    /// Canvas-space rotation center: the center of the full frame.
    fn pivot(&self) -> Point {
        self.image.bounds().center()
    }
}

/// Result of flattening layers.
#[derive(Debug, Clone)]
pub struct Combined {
    /// Flattened pixels.
    pub image: RgbaImage,
    /// Canvas-space rectangle the pixels cover.
    pub bounds: Rect,
    /// Output pixels per canvas unit.
    pub scale: f64,
}

/// Output resolution multiplier for a set of layers.
///
/// The largest per-layer scale factor, never below 1 and never above `cap`.
#[must_use]
pub fn optimal_scale(layers: &[Layer<'_>], cap: f64) -> f64 {
    layers
        .iter()
        .map(Layer::scale_factor)
        .fold(1.0_f64, f64::max)
        .min(cap)
}

/// Flatten `layers`, bottom-most first, into one raster.
///
/// # Errors
///
/// - [`CompositeError::InvalidInput`] if fewer than two layers are given.
/// - [`CompositeError::Geometry`] if the union or the output is empty, or if
///   the output or any resampled layer would exceed `max_pixels`.
pub fn combine(layers: &[Layer<'_>], cap: f64, max_pixels: u64) -> CompositeResult<Combined> {
    if layers.len() < 2 {
        return Err(CompositeError::InvalidInput(format!(
            "Combining needs at least two images, got {}",
            layers.len()
        )));
    }

    let bounds = layers
        .iter()
        .map(Layer::footprint)
        .reduce(|acc, r| acc.union(&r))
        .filter(Rect::has_area)
        .ok_or_else(|| CompositeError::Geometry("Combined bounds are empty".to_string()))?;

    let scale = optimal_scale(layers, cap);
    let (width, height) = pixel_size(bounds.width * scale, bounds.height * scale, max_pixels)?;
    if width == 0 || height == 0 {
        return Err(CompositeError::Geometry(format!(
            "Combined output would be {width}x{height} pixels"
        )));
    }
    let targets = layers
        .iter()
        .map(|layer| {
            let visible = layer.image.visible_rect();
            let (tw, th) =
                pixel_size(visible.width * scale, visible.height * scale, max_pixels)?;
            Ok((tw.max(1), th.max(1)))
        })
        .collect::<CompositeResult<Vec<_>>>()?;

    tracing::debug!(
        layers = layers.len(),
        width,
        height,
        scale,
        "combining images"
    );

    let mut out = RgbaImage::new(width, height);
    for (layer, target) in layers.iter().zip(targets) {
        paint(&mut out, layer, target, bounds, scale)?;
    }

    Ok(Combined {
        image: out,
        bounds,
        scale,
    })
}

/// Round a size in output pixels, refusing anything over `max_pixels`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_size(width: f64, height: f64, max_pixels: u64) -> CompositeResult<(u32, u32)> {
    let too_large = || {
        CompositeError::Geometry(format!(
            "Combined output of {width:.0}x{height:.0} pixels exceeds the {max_pixels} pixel limit"
        ))
    };
    let (w, h) = (width.round(), height.round());
    if !(w.is_finite() && h.is_finite()) || w > f64::from(u32::MAX) || h > f64::from(u32::MAX) {
        return Err(too_large());
    }
    let (w, h) = (w.max(0.0) as u32, h.max(0.0) as u32);
    match u64::from(w).checked_mul(u64::from(h)) {
        Some(n) if n <= max_pixels => Ok((w, h)),
        _ => Err(too_large()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn paint(
    out: &mut RgbaImage,
    layer: &Layer<'_>,
    (tw, th): (u32, u32),
    bounds: Rect,
    scale: f64,
) -> CompositeResult<()> {
    let visible = layer.image.visible_rect();
    let cropped = bake(layer.pixels, layer.image.crop_box.as_ref())?;

    let scaled = if cropped.dimensions() == (tw, th) {
        cropped
    } else {
        imageops::resize(&cropped, tw, th, FilterType::Lanczos3)
    };

    let rotation = layer.image.rotation % 360.0;
    if rotation.abs() < 1e-9 {
        let ox = ((visible.x - bounds.x) * scale).round();
        let oy = ((visible.y - bounds.y) * scale).round();
        imageops::overlay(out, &scaled, ox as i64, oy as i64);
        return Ok(());
    }

    paint_rotated(out, &scaled, visible, layer.pivot(), rotation, bounds, scale);
    Ok(())
}

/// Paint a rotated layer by inverse-mapping every output pixel in its
/// footprint back into the layer (nearest sample).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn paint_rotated(
    out: &mut RgbaImage,
    layer: &RgbaImage,
    visible: Rect,
    pivot: Point,
    rotation: f64,
    bounds: Rect,
    scale: f64,
) {
    let to_out = |p: Point| Point::new((p.x - bounds.x) * scale, (p.y - bounds.y) * scale);
    let center = to_out(visible.center());
    let origin = Point::new(
        center.x - f64::from(layer.width()) / 2.0,
        center.y - f64::from(layer.height()) / 2.0,
    );
    let pivot_out = to_out(pivot);

    let footprint = visible.rotated_bounds_about(pivot, rotation);
    let start = to_out(Point::new(footprint.x, footprint.y));
    let end = to_out(Point::new(footprint.right(), footprint.bottom()));
    let x0 = start.x.floor().max(0.0) as u32;
    let y0 = start.y.floor().max(0.0) as u32;
    let x1 = (end.x.ceil().max(0.0) as u32).min(out.width());
    let y1 = (end.y.ceil().max(0.0) as u32).min(out.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let sample = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5)
                .rotated_about(pivot_out, -rotation);
            let sx = (sample.x - origin.x).floor();
            let sy = (sample.y - origin.y).floor();
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            let (sx, sy) = (sx as u32, sy as u32);
            if sx >= layer.width() || sy >= layer.height() {
                continue;
            }
            out.get_pixel_mut(px, py).blend(layer.get_pixel(sx, sy));
        }
    }
}
