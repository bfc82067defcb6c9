//! Gesture state machine types.
//!
//! [`Gesture`] is the interaction being tracked between pointer-down and
//! pointer-up. Each active variant carries the context needed to compute
//! incremental deltas. [`Intent`] is what the synchronous state machine
//! hands to the async editor when an action needs the compositor or a
//! collaborator.

use crate::crop::{CropCommit, CropGrab};
use crate::geometry::{Handle, Point};
use crate::selection::Marquee;
use crate::ImageId;

/// The interaction in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    /// Nothing in progress; waiting for the next press.
    #[default]
    Idle,
    /// Dragging the canvas itself.
    Panning {
        /// Screen position at the previous event.
        last_screen: Point,
    },
    /// Two-finger zoom.
    Pinching {
        /// Touch positions at the previous event.
        touches: (Point, Point),
    },
    /// Dragging out a selection rectangle.
    Marqueeing {
        /// The rectangle so far.
        marquee: Marquee,
    },
    /// Moving every selected image.
    Dragging {
        /// Canvas position at the previous event.
        last_canvas: Point,
        /// Image that was pressed.
        target: ImageId,
        /// Whether anything has moved yet (history is pushed on the first move).
        moved: bool,
    },
    /// Resizing the single selected image by one of its handles.
    Resizing {
        /// Image being resized.
        id: ImageId,
        /// Handle being dragged.
        handle: Handle,
        /// Canvas position at the previous event.
        last_canvas: Point,
        /// Whether anything has moved yet.
        moved: bool,
    },
    /// Editing the crop box of the image in crop mode.
    Cropping {
        /// What was grabbed.
        grab: CropGrab,
        /// Canvas position at the previous event.
        last_canvas: Point,
    },
}

impl Gesture {
    /// Whether no gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Work the synchronous state machine cannot do by itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Bake a committed crop into a new source.
    CommitCrop(CropCommit),
    /// Run generation for the current selection (or from text if nothing
    /// is selected).
    Generate,
}
