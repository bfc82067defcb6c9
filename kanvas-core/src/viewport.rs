//! Camera state and the screen/canvas coordinate mapping.
//!
//! `x, y` is the screen-space position of the canvas origin and `scale` the
//! uniform zoom, so `screen = canvas * scale + (x, y)`.

use serde::{Deserialize, Serialize};

use crate::config::ViewportLimits;
use crate::event::{Modifiers, WheelDelta};
use crate::geometry::{Point, Size};

/// Pan + zoom transform from canvas space to screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Screen-space x of the canvas origin.
    pub x: f64,
    /// Screen-space y of the canvas origin.
    pub y: f64,
    /// Uniform zoom (1.0 = 100%).
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    /// Convert a screen-space point to canvas space.
    #[must_use]
    pub fn to_canvas(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.x) / self.scale,
            (screen.y - self.y) / self.scale,
        )
    }

    /// Convert a canvas-space point to screen space.
    #[must_use]
    pub fn to_screen(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.scale + self.x, canvas.y * self.scale + self.y)
    }

    /// Convert a screen-space distance to canvas space.
    #[must_use]
    pub fn screen_dist_to_canvas(&self, dist: f64) -> f64 {
        dist / self.scale
    }

    /// Canvas-space point at the center of a screen of the given size.
    #[must_use]
    pub fn canvas_center(&self, screen: Size) -> Point {
        self.to_canvas(Point::new(screen.width / 2.0, screen.height / 2.0))
    }

    /// Translate by a screen-space delta.
    pub fn pan(&mut self, delta: Point) {
        self.x += delta.x;
        self.y += delta.y;
    }

    /// Multiply the scale by `factor`, keeping the canvas point under
    /// `anchor` fixed on screen.
    ///
    /// The new offset is solved with the clamped scale, so the anchor holds
    /// even when the clamp kicks in. Returns `true` if clamping changed the
    /// requested scale.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64, limits: &ViewportLimits) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let requested = self.scale * factor;
        let new_scale = limits.clamp(requested);
        let anchor_canvas = self.to_canvas(anchor);
        self.scale = new_scale;
        self.x = anchor.x - anchor_canvas.x * new_scale;
        self.y = anchor.y - anchor_canvas.y * new_scale;
        (new_scale - requested).abs() > f64::EPSILON
    }

    /// Two-finger pinch from the `previous` touch pair to the `current` one.
    ///
    /// Zooms by the ratio of touch distances about the current midpoint.
    pub fn pinch(
        &mut self,
        previous: (Point, Point),
        current: (Point, Point),
        limits: &ViewportLimits,
    ) {
        let old_dist = previous.0.distance(previous.1);
        let new_dist = current.0.distance(current.1);
        if old_dist <= f64::EPSILON {
            return;
        }
        let center = current.0.midpoint(current.1);
        self.zoom_at(center, new_dist / old_dist, limits);
    }

    /// Interpret a wheel event.
    ///
    /// With ctrl/meta held (also how trackpad pinch arrives) the wheel zooms
    /// about `anchor`, with at most `max_wheel_steps` steps per event. Otherwise
    /// it pans by the negated delta; shift turns vertical scroll into
    /// horizontal.
    pub fn wheel(
        &mut self,
        anchor: Point,
        delta: WheelDelta,
        modifiers: Modifiers,
        limits: &ViewportLimits,
    ) {
        if modifiers.command() {
            let steps = delta.dy.abs().min(limits.max_wheel_steps);
            let step = limits.wheel_step.powf(steps);
            let factor = if delta.dy > 0.0 { 1.0 / step } else { step };
            self.zoom_at(anchor, factor, limits);
            return;
        }

        let (dx, dy) = if modifiers.shift {
            (delta.dy, 0.0)
        } else {
            (delta.dx, delta.dy)
        };
        self.pan(Point::new(-dx, -dy));
    }

    /// Back to the origin at 100%.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
