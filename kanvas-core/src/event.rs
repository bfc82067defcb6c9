//! Input events for canvas interaction.
//!
//! All positions are in screen space; the state machine converts them to
//! canvas space through the current viewport.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Only ctrl held.
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        alt: false,
        meta: false,
    };

    /// Only shift held.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether a click should toggle rather than replace the selection.
    #[must_use]
    pub fn multi_select(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Secondary,
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// Screen position.
    pub position: Point,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

/// All input events the canvas can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// A pointer button was pressed.
    PointerDown {
        /// Screen position.
        position: Point,
        /// Which button.
        button: Button,
        /// Held modifiers.
        #[serde(default)]
        modifiers: Modifiers,
    },

    /// The pointer moved.
    PointerMove {
        /// Screen position.
        position: Point,
        /// Held modifiers.
        #[serde(default)]
        modifiers: Modifiers,
    },

    /// A pointer button was released.
    PointerUp {
        /// Screen position.
        position: Point,
        /// Held modifiers.
        #[serde(default)]
        modifiers: Modifiers,
    },

    /// Primary button double-clicked.
    DoubleClick {
        /// Screen position.
        position: Point,
    },

    /// Wheel or trackpad scroll.
    Wheel {
        /// Screen position of the pointer.
        position: Point,
        /// Scroll delta.
        delta: WheelDelta,
        /// Held modifiers.
        #[serde(default)]
        modifiers: Modifiers,
    },

    /// Raw touch event carrying every current touch point.
    Touch {
        /// Phase.
        phase: TouchPhase,
        /// Active touches.
        touches: Vec<TouchPoint>,
    },

    /// A key was pressed. `key` is the key name as reported by the host
    /// (e.g. `"Delete"`, `"z"`, `"Escape"`).
    Key {
        /// Key name.
        key: String,
        /// Held modifiers.
        #[serde(default)]
        modifiers: Modifiers,
    },
}

impl InputEvent {
    /// Convenience constructor for a primary-button press.
    #[must_use]
    pub fn press(x: f64, y: f64) -> Self {
        Self::PointerDown {
            position: Point::new(x, y),
            button: Button::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    /// Convenience constructor for a pointer move.
    #[must_use]
    pub fn moved(x: f64, y: f64) -> Self {
        Self::PointerMove {
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    /// Convenience constructor for a pointer release.
    #[must_use]
    pub fn release(x: f64, y: f64) -> Self {
        Self::PointerUp {
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
        }
    }

    /// Convenience constructor for a key press.
    #[must_use]
    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
        }
    }
}
