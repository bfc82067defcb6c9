//! Canvas state management.
//!
//! [`CanvasState`] is the single mutator of the scene. It turns input events
//! into viewport changes, selection changes and scene edits, pushing history
//! before every user-visible edit.

use tracing::debug;

use crate::config::EditorConfig;
use crate::crop::{CropEditor, CropGrab};
use crate::event::{Button, InputEvent, Modifiers, TouchPhase, TouchPoint, WheelDelta};
use crate::geometry::{Handle, Point, Size};
use crate::history::History;
use crate::input::{Gesture, Intent};
use crate::scene::{Scene, ZOrder};
use crate::selection::{self, Marquee};
use crate::viewport::Viewport;
use crate::{ImageId, ImagePatch, PlacedImage};

/// The complete interactive canvas state.
#[derive(Debug, Clone)]
pub struct CanvasState {
    /// The scene.
    pub scene: Scene,
    /// Camera.
    pub viewport: Viewport,
    /// Undo/redo history.
    pub history: History,
    /// Crop mode.
    pub crop: CropEditor,
    /// Editing policy.
    pub config: EditorConfig,
    /// Size of the visible screen area.
    pub screen: Size,
    gesture: Gesture,
    last_touch: Option<Point>,
    /// Where a one-finger pan on empty space started.
    touch_pan_origin: Option<Point>,
}

impl CanvasState {
    /// Create an empty canvas and record it as the first history entry.
    #[must_use]
    pub fn new(config: EditorConfig, screen: Size) -> Self {
        let mut history = History::new(config.history_depth);
        let scene = Scene::new();
        history.push(&scene);
        Self {
            scene,
            viewport: Viewport::default(),
            history,
            crop: CropEditor::new(config.min_crop_size),
            config,
            screen,
            gesture: Gesture::Idle,
            last_touch: None,
            touch_pan_origin: None,
        }
    }

    /// Replace the scene and viewport (e.g. after loading) and restart history.
    pub fn load(&mut self, scene: Scene, viewport: Viewport) {
        self.crop.abandon();
        self.scene = scene;
        self.viewport = viewport;
        self.history.reset(&self.scene);
        self.gesture = Gesture::Idle;
    }

    /// The gesture in progress.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Record the current scene as an undo point. Call before mutating.
    pub fn checkpoint(&mut self) {
        self.history.push(&self.scene);
    }

    /// Process an input event, returning any work for the async editor.
    pub fn process_event(&mut self, event: &InputEvent) -> Vec<Intent> {
        let mut intents = Vec::new();
        match event {
            InputEvent::PointerDown {
                position,
                button,
                modifiers,
            } => self.pointer_down(*position, *button, *modifiers, &mut intents),
            InputEvent::PointerMove { position, .. } => self.pointer_move(*position),
            InputEvent::PointerUp {
                position,
                modifiers,
            } => self.pointer_up(*position, *modifiers),
            InputEvent::DoubleClick { position } => self.double_click(*position),
            InputEvent::Wheel {
                position,
                delta,
                modifiers,
            } => self.wheel(*position, *delta, *modifiers),
            InputEvent::Touch { phase, touches } => self.touch(*phase, touches, &mut intents),
            InputEvent::Key { key, modifiers } => self.key(key, *modifiers, &mut intents),
        }
        intents
    }

    fn handle_radius(&self) -> f64 {
        self.viewport.screen_dist_to_canvas(self.config.handle_radius)
    }

    fn pointer_down(
        &mut self,
        screen: Point,
        button: Button,
        modifiers: Modifiers,
        intents: &mut Vec<Intent>,
    ) {
        let p = self.viewport.to_canvas(screen);

        if self.crop.is_active() {
            if let Some(grab) = self.crop.hit(&self.scene, p, self.handle_radius()) {
                self.gesture = Gesture::Cropping {
                    grab,
                    last_canvas: p,
                };
            } else if let Some(commit) = self.crop.commit(&self.scene) {
                intents.push(Intent::CommitCrop(commit));
            }
            return;
        }

        match button {
            Button::Middle => {
                self.gesture = Gesture::Panning {
                    last_screen: screen,
                };
            }
            Button::Secondary => {}
            Button::Primary => self.primary_down(p, modifiers),
        }
    }

    /// Resize handle of the single selected image under `p`.
    fn handle_at(&self, p: Point) -> Option<(ImageId, Handle)> {
        let image = self.scene.single_selection()?;
        let bounds = image.bounds();
        let local = p.rotated_about(bounds.center(), -image.rotation);
        Handle::hit(&bounds, local, self.handle_radius()).map(|handle| (image.id, handle))
    }

    fn primary_down(&mut self, p: Point, modifiers: Modifiers) {
        if let Some((id, handle)) = self.handle_at(p) {
            self.gesture = Gesture::Resizing {
                id,
                handle,
                last_canvas: p,
                moved: false,
            };
            return;
        }

        let Some(id) = self.scene.image_at(p) else {
            self.scene.clear_selection();
            self.gesture = Gesture::Marqueeing {
                marquee: Marquee::new(p),
            };
            return;
        };

        if modifiers.multi_select() {
            selection::click_select(&mut self.scene, id, modifiers);
        } else if !self.scene.is_selected(id) {
            self.scene.select_only(id);
        }

        if self.scene.is_selected(id) {
            self.gesture = Gesture::Dragging {
                last_canvas: p,
                target: id,
                moved: false,
            };
        }
    }

    fn pointer_move(&mut self, screen: Point) {
        let p = self.viewport.to_canvas(screen);
        match &mut self.gesture {
            Gesture::Idle | Gesture::Pinching { .. } => {}
            Gesture::Panning { last_screen } => {
                let delta = screen - *last_screen;
                *last_screen = screen;
                self.viewport.pan(delta);
            }
            Gesture::Marqueeing { marquee } => marquee.update(p),
            Gesture::Dragging {
                last_canvas, moved, ..
            } => {
                let delta = p - *last_canvas;
                *last_canvas = p;
                if !*moved {
                    *moved = true;
                    self.history.push(&self.scene);
                }
                self.move_selection(delta);
            }
            Gesture::Resizing {
                id,
                handle,
                last_canvas,
                moved,
            } => {
                let delta = p - *last_canvas;
                *last_canvas = p;
                if !*moved {
                    *moved = true;
                    self.history.push(&self.scene);
                }
                let (id, handle) = (*id, *handle);
                self.resize_image(id, handle, delta);
            }
            Gesture::Cropping { grab, last_canvas } => {
                let delta = p - *last_canvas;
                *last_canvas = p;
                match *grab {
                    CropGrab::Move => self.crop.drag(&mut self.scene, delta),
                    CropGrab::Handle(handle) => self.crop.resize(&mut self.scene, handle, delta),
                }
            }
        }
    }

    fn pointer_up(&mut self, screen: Point, modifiers: Modifiers) {
        let p = self.viewport.to_canvas(screen);
        match std::mem::take(&mut self.gesture) {
            Gesture::Marqueeing { mut marquee } => {
                marquee.update(p);
                let n = selection::finish_marquee(
                    &mut self.scene,
                    &marquee,
                    self.config.marquee_threshold,
                );
                debug!(selected = n, "marquee finished");
            }
            Gesture::Dragging {
                target,
                moved: false,
                ..
            } if !modifiers.multi_select() => {
                // A plain click on one image of a multi-selection narrows to it.
                self.scene.select_only(target);
            }
            _ => {}
        }
    }

    fn double_click(&mut self, screen: Point) {
        let p = self.viewport.to_canvas(screen);
        self.gesture = Gesture::Idle;
        if let Some(id) = self.scene.image_at(p) {
            self.scene.select_only(id);
            if let Err(e) = self.crop.begin(&mut self.scene, id) {
                debug!(%id, error = %e, "cannot enter crop mode");
            }
        }
    }

    fn wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) {
        self.viewport
            .wheel(screen, delta, modifiers, &self.config.viewport);
    }

    fn touch(&mut self, phase: TouchPhase, touches: &[TouchPoint], intents: &mut Vec<Intent>) {
        match (phase, touches) {
            (TouchPhase::Start | TouchPhase::Move, [a, b, ..]) => {
                self.touch_pan_origin = None;
                let current = (a.position, b.position);
                if let Gesture::Pinching { touches: previous } = self.gesture {
                    self.viewport
                        .pinch(previous, current, &self.config.viewport);
                }
                self.gesture = Gesture::Pinching { touches: current };
            }
            (TouchPhase::Start, [only]) => {
                let screen = only.position;
                self.last_touch = Some(screen);
                let p = self.viewport.to_canvas(screen);
                let on_empty = !self.crop.is_active()
                    && self.handle_at(p).is_none()
                    && self.scene.image_at(p).is_none();
                if on_empty {
                    // One finger on empty space pans; marquees need a pointer.
                    self.touch_pan_origin = Some(screen);
                    self.gesture = Gesture::Panning {
                        last_screen: screen,
                    };
                } else {
                    self.pointer_down(screen, Button::Primary, Modifiers::NONE, intents);
                }
            }
            (TouchPhase::Move, [only]) => {
                if !matches!(self.gesture, Gesture::Pinching { .. }) {
                    self.last_touch = Some(only.position);
                    self.pointer_move(only.position);
                }
            }
            (TouchPhase::End | TouchPhase::Cancel, _) => {
                if matches!(self.gesture, Gesture::Pinching { .. }) {
                    self.gesture = Gesture::Idle;
                } else if let Some(origin) = self.touch_pan_origin.take() {
                    self.gesture = Gesture::Idle;
                    let end = touches
                        .first()
                        .map(|t| t.position)
                        .or(self.last_touch)
                        .unwrap_or(origin);
                    let travel = end - origin;
                    let threshold = self.config.marquee_threshold;
                    if phase == TouchPhase::End
                        && travel.x.abs() < threshold
                        && travel.y.abs() < threshold
                    {
                        // A tap on empty space deselects.
                        self.scene.clear_selection();
                    }
                } else {
                    let at = touches
                        .first()
                        .map(|t| t.position)
                        .or(self.last_touch)
                        .unwrap_or_default();
                    self.pointer_up(at, Modifiers::NONE);
                }
                self.last_touch = None;
            }
            (TouchPhase::Start | TouchPhase::Move, []) => {}
        }
    }

    fn key(&mut self, key: &str, modifiers: Modifiers, intents: &mut Vec<Intent>) {
        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "z" if modifiers.command() => {
                if modifiers.shift {
                    self.redo();
                } else {
                    self.undo();
                }
            }
            "y" if modifiers.command() => {
                self.redo();
            }
            "a" if modifiers.command() => self.scene.select_all(),
            "d" if modifiers.command() => {
                self.duplicate_selection();
            }
            "enter" if modifiers.command() => intents.push(Intent::Generate),
            "delete" | "backspace" if !self.crop.is_active() => {
                self.delete_selection();
            }
            "escape" => self.crop.cancel(&mut self.scene),
            "0" if modifiers.command() => self.viewport.reset(),
            "+" | "=" => self.zoom_by(self.config.viewport.keyboard_factor),
            "-" => self.zoom_by(1.0 / self.config.viewport.keyboard_factor),
            _ => {}
        }
    }

    /// Zoom about the screen center.
    pub fn zoom_by(&mut self, factor: f64) {
        let center = Point::new(self.screen.width / 2.0, self.screen.height / 2.0);
        self.viewport
            .zoom_at(center, factor, &self.config.viewport);
    }

    fn move_selection(&mut self, delta: Point) {
        let moves: Vec<(ImageId, f64, f64)> = self
            .scene
            .selected_in_z_order()
            .map(|img| (img.id, img.x + delta.x, img.y + delta.y))
            .collect();
        for (id, x, y) in moves {
            self.scene.update(id, &ImagePatch::position(x, y));
        }
    }

    fn resize_image(&mut self, id: ImageId, handle: Handle, delta: Point) {
        let Some(image) = self.scene.get(id) else {
            return;
        };
        let local = if image.rotation == 0.0 {
            delta
        } else {
            delta.rotated_about(Point::default(), -image.rotation)
        };
        let rect = image
            .bounds()
            .resized(handle, local, self.config.min_image_size);
        self.scene.update(id, &ImagePatch::rect(rect));
    }

    /// Step back in history. Returns `false` at the start.
    ///
    /// An open crop session is cancelled first so its uncommitted box never
    /// becomes a history entry.
    pub fn undo(&mut self) -> bool {
        self.crop.cancel(&mut self.scene);
        match self.history.undo(&self.scene) {
            Some(scene) => {
                self.restore(scene);
                true
            }
            None => false,
        }
    }

    /// Step forward in history. Returns `false` at the tail.
    pub fn redo(&mut self) -> bool {
        self.crop.cancel(&mut self.scene);
        match self.history.redo() {
            Some(scene) => {
                self.restore(scene);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, scene: Scene) {
        self.crop.abandon();
        self.gesture = Gesture::Idle;
        self.scene = scene;
    }

    /// Delete the selected images. Returns them, bottom to top.
    pub fn delete_selection(&mut self) -> Vec<PlacedImage> {
        if self.scene.selected().is_empty() {
            return Vec::new();
        }
        self.checkpoint();
        let ids = self.scene.selected().to_vec();
        let removed = self.scene.remove(&ids);
        debug!(count = removed.len(), "deleted images");
        removed
    }

    /// Copy the selected images with an offset and select the copies.
    pub fn duplicate_selection(&mut self) -> Vec<ImageId> {
        let offset = self.config.duplicate_offset;
        let copies: Vec<PlacedImage> = self
            .scene
            .selected_in_z_order()
            .map(|img| PlacedImage {
                id: ImageId::new(),
                x: img.x + offset,
                y: img.y + offset,
                is_generated: false,
                parent_group_id: None,
                ..img.clone()
            })
            .collect();
        if copies.is_empty() {
            return Vec::new();
        }
        self.checkpoint();
        let mut ids = Vec::with_capacity(copies.len());
        for copy in copies {
            if let Ok(id) = self.scene.add(copy) {
                ids.push(id);
            }
        }
        self.scene.set_selection(ids.iter().copied());
        ids
    }

    /// Move the selection in the stacking order.
    pub fn reorder_selection(&mut self, position: ZOrder) {
        if self.scene.selected().is_empty() {
            return;
        }
        self.checkpoint();
        let ids = self.scene.selected().to_vec();
        self.scene.reorder(&ids, position);
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(EditorConfig::default(), Size::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CropBox, ImageSource};

    fn state_with_images(rects: &[(f64, f64, f64, f64)]) -> (CanvasState, Vec<ImageId>) {
        let mut state = CanvasState::default();
        let ids = rects
            .iter()
            .map(|&(x, y, w, h)| {
                state
                    .scene
                    .add(PlacedImage::new(ImageSource::placeholder(), x, y, w, h))
                    .expect("add")
            })
            .collect();
        (state, ids)
    }

    fn click(state: &mut CanvasState, x: f64, y: f64) -> Vec<Intent> {
        let mut intents = state.process_event(&InputEvent::press(x, y));
        intents.extend(state.process_event(&InputEvent::release(x, y)));
        intents
    }

    #[test]
    fn test_click_selects_and_empty_click_clears() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 100.0, 100.0)]);
        click(&mut state, 50.0, 50.0);
        assert_eq!(state.scene.selected(), &[ids[0]]);
        click(&mut state, 500.0, 500.0);
        assert!(state.scene.selected().is_empty());
        assert!(state.gesture().is_idle());
    }

    #[test]
    fn test_drag_moves_selection_and_pushes_once() {
        let (mut state, ids) =
            state_with_images(&[(0.0, 0.0, 100.0, 100.0), (200.0, 0.0, 100.0, 100.0)]);
        state.scene.set_selection(ids.clone());
        let history_before = state.history.len();

        state.process_event(&InputEvent::press(50.0, 50.0));
        state.process_event(&InputEvent::moved(60.0, 55.0));
        state.process_event(&InputEvent::moved(70.0, 60.0));
        state.process_event(&InputEvent::release(70.0, 60.0));

        let a = state.scene.get(ids[0]).expect("a");
        let b = state.scene.get(ids[1]).expect("b");
        assert!((a.x - 20.0).abs() < 1e-9 && (a.y - 10.0).abs() < 1e-9);
        assert!((b.x - 220.0).abs() < 1e-9);
        assert_eq!(state.history.len(), history_before + 1);

        assert!(state.undo());
        let a = state.scene.get(ids[0]).expect("a");
        assert!(a.x.abs() < 1e-9);
    }

    #[test]
    fn test_click_in_multi_selection_narrows() {
        let (mut state, ids) =
            state_with_images(&[(0.0, 0.0, 100.0, 100.0), (200.0, 0.0, 100.0, 100.0)]);
        state.scene.set_selection(ids.clone());
        click(&mut state, 250.0, 50.0);
        assert_eq!(state.scene.selected(), &[ids[1]]);
    }

    #[test]
    fn test_shift_click_toggles() {
        let (mut state, ids) =
            state_with_images(&[(0.0, 0.0, 100.0, 100.0), (200.0, 0.0, 100.0, 100.0)]);
        click(&mut state, 50.0, 50.0);
        let shift_press = InputEvent::PointerDown {
            position: Point::new(250.0, 50.0),
            button: Button::Primary,
            modifiers: Modifiers::SHIFT,
        };
        state.process_event(&shift_press);
        state.process_event(&InputEvent::PointerUp {
            position: Point::new(250.0, 50.0),
            modifiers: Modifiers::SHIFT,
        });
        assert_eq!(state.scene.selected(), &[ids[0], ids[1]]);
    }

    #[test]
    fn test_marquee_selection() {
        let (mut state, ids) =
            state_with_images(&[(0.0, 0.0, 10.0, 10.0), (100.0, 100.0, 10.0, 10.0)]);
        state.process_event(&InputEvent::press(-5.0, -5.0));
        state.process_event(&InputEvent::moved(20.0, 20.0));
        state.process_event(&InputEvent::release(20.0, 20.0));
        assert_eq!(state.scene.selected(), &[ids[0]]);
    }

    #[test]
    fn test_resize_via_handle() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 100.0, 100.0)]);
        state.scene.select_only(ids[0]);
        state.process_event(&InputEvent::press(100.0, 100.0));
        assert!(matches!(state.gesture(), Gesture::Resizing { .. }));
        state.process_event(&InputEvent::moved(-500.0, 150.0));
        state.process_event(&InputEvent::release(-500.0, 150.0));
        let img = state.scene.get(ids[0]).expect("img");
        assert!((img.width - 5.0).abs() < 1e-9);
        assert!((img.height - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_middle_button_pans() {
        let mut state = CanvasState::default();
        state.process_event(&InputEvent::PointerDown {
            position: Point::new(10.0, 10.0),
            button: Button::Middle,
            modifiers: Modifiers::NONE,
        });
        state.process_event(&InputEvent::moved(40.0, 30.0));
        state.process_event(&InputEvent::release(40.0, 30.0));
        assert_eq!(state.viewport, Viewport::new(30.0, 20.0, 1.0));
    }

    #[test]
    fn test_double_click_enters_crop_and_outside_click_commits() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 200.0, 200.0)]);
        state.process_event(&InputEvent::DoubleClick {
            position: Point::new(100.0, 100.0),
        });
        assert_eq!(state.crop.cropping_id(), Some(ids[0]));

        // Drag the bottom-right crop handle inwards.
        state.process_event(&InputEvent::press(200.0, 200.0));
        state.process_event(&InputEvent::moved(150.0, 150.0));
        state.process_event(&InputEvent::release(150.0, 150.0));
        let live = state.scene.get(ids[0]).and_then(|img| img.crop_box);
        assert_eq!(live, Some(CropBox::new(0.0, 0.0, 0.75, 0.75).expect("valid")));

        let intents = click(&mut state, 900.0, 900.0);
        assert!(matches!(intents.as_slice(), [Intent::CommitCrop(c)] if c.id == ids[0]));
        assert!(!state.crop.is_active());
    }

    #[test]
    fn test_escape_cancels_crop() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 200.0, 200.0)]);
        state.process_event(&InputEvent::DoubleClick {
            position: Point::new(100.0, 100.0),
        });
        state.process_event(&InputEvent::press(200.0, 200.0));
        state.process_event(&InputEvent::moved(150.0, 150.0));
        state.process_event(&InputEvent::release(150.0, 150.0));
        state.process_event(&InputEvent::key("Escape", Modifiers::NONE));
        assert!(!state.crop.is_active());
        assert!(state.scene.get(ids[0]).and_then(|img| img.crop_box).is_none());
    }

    #[test]
    fn test_undo_during_crop_discards_uncommitted_box() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 200.0, 200.0)]);
        state.process_event(&InputEvent::DoubleClick {
            position: Point::new(100.0, 100.0),
        });
        state.process_event(&InputEvent::press(200.0, 200.0));
        state.process_event(&InputEvent::moved(150.0, 150.0));
        state.process_event(&InputEvent::release(150.0, 150.0));
        assert!(state.scene.get(ids[0]).and_then(|img| img.crop_box).is_some());

        state.process_event(&InputEvent::key("z", Modifiers::CTRL));
        assert!(!state.crop.is_active());
        assert!(state.scene.is_empty());

        let redo = Modifiers {
            shift: true,
            ..Modifiers::CTRL
        };
        state.process_event(&InputEvent::key("z", redo));
        let image = state.scene.get(ids[0]).expect("restored");
        assert!(image.crop_box.is_none());
        assert!(!state.crop.is_active());
    }

    #[test]
    fn test_one_finger_on_empty_space_pans() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 50.0, 50.0)]);
        state.scene.select_only(ids[0]);
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Start,
            touches: vec![TouchPoint::new(0, 100.0, 100.0)],
        });
        assert!(matches!(state.gesture(), Gesture::Panning { .. }));
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Move,
            touches: vec![TouchPoint::new(0, 160.0, 130.0)],
        });
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::End,
            touches: vec![],
        });
        assert_eq!(state.viewport, Viewport::new(60.0, 30.0, 1.0));
        assert!(state.gesture().is_idle());
        // A pan is not a tap; the selection survives.
        assert_eq!(state.scene.selected(), &[ids[0]]);
    }

    #[test]
    fn test_one_finger_tap_on_empty_space_deselects() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 50.0, 50.0)]);
        state.scene.select_only(ids[0]);
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Start,
            touches: vec![TouchPoint::new(0, 300.0, 300.0)],
        });
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::End,
            touches: vec![],
        });
        assert!(state.scene.selected().is_empty());
        assert_eq!(state.viewport, Viewport::default());
    }

    #[test]
    fn test_one_finger_on_image_drags_it() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 50.0, 50.0)]);
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Start,
            touches: vec![TouchPoint::new(0, 25.0, 25.0)],
        });
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Move,
            touches: vec![TouchPoint::new(0, 35.0, 45.0)],
        });
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::End,
            touches: vec![],
        });
        let image = state.scene.get(ids[0]).expect("image");
        assert!((image.x - 10.0).abs() < 1e-9);
        assert!((image.y - 20.0).abs() < 1e-9);
        assert_eq!(state.viewport, Viewport::default());
    }

    #[test]
    fn test_keyboard_commands() {
        let (mut state, ids) = state_with_images(&[(0.0, 0.0, 10.0, 10.0)]);

        state.process_event(&InputEvent::key("a", Modifiers::CTRL));
        assert_eq!(state.scene.selected(), &[ids[0]]);

        state.process_event(&InputEvent::key("d", Modifiers::CTRL));
        assert_eq!(state.scene.len(), 2);
        let copy = state.scene.selected()[0];
        assert_ne!(copy, ids[0]);
        assert!((state.scene.get(copy).expect("copy").x - 20.0).abs() < 1e-9);

        state.process_event(&InputEvent::key("Delete", Modifiers::NONE));
        assert_eq!(state.scene.len(), 1);

        state.process_event(&InputEvent::key("z", Modifiers::CTRL));
        assert_eq!(state.scene.len(), 2);
        let redo = Modifiers {
            shift: true,
            ..Modifiers::CTRL
        };
        state.process_event(&InputEvent::key("Z", redo));
        assert_eq!(state.scene.len(), 1);

        let intents = state.process_event(&InputEvent::key("Enter", Modifiers::CTRL));
        assert_eq!(intents, vec![Intent::Generate]);
    }

    #[test]
    fn test_keyboard_zoom_about_center() {
        let mut state = CanvasState::default();
        let center = Point::new(400.0, 300.0);
        let before = state.viewport.to_canvas(center);
        state.process_event(&InputEvent::key("+", Modifiers::NONE));
        assert!((state.viewport.scale - 1.2).abs() < 1e-9);
        let after = state.viewport.to_canvas(center);
        assert!((after.x - before.x).abs() < 1e-9);

        state.process_event(&InputEvent::key("0", Modifiers::CTRL));
        assert_eq!(state.viewport, Viewport::default());
    }

    #[test]
    fn test_pinch_zoom() {
        let mut state = CanvasState::default();
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Start,
            touches: vec![TouchPoint::new(0, 100.0, 100.0), TouchPoint::new(1, 200.0, 100.0)],
        });
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::Move,
            touches: vec![TouchPoint::new(0, 50.0, 100.0), TouchPoint::new(1, 250.0, 100.0)],
        });
        assert!((state.viewport.scale - 2.0).abs() < 1e-9);
        state.process_event(&InputEvent::Touch {
            phase: TouchPhase::End,
            touches: vec![],
        });
        assert!(state.gesture().is_idle());
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut state = CanvasState::default();
        assert!(!state.undo());
        assert!(!state.redo());
        assert!(state.scene.is_empty());
    }
}
