//! Snapshot-based undo/redo over the scene.
//!
//! The stack is a linear list of scene snapshots with a cursor. Actions call
//! [`History::push`] with the scene as it is *before* they mutate it, so the
//! pre-action state is always recoverable:
//!
//! ```text
//! push(s0)            [s0]          cursor 0   live s0
//! delete              push(s0) dedups, live becomes s1
//! undo                [s0, s1]      cursor 0   live s0   (s1 captured first)
//! redo                [s0, s1]      cursor 1   live s1
//! ```
//!
//! When the live scene differs from the snapshot under the cursor, `undo`
//! first records it as the new tail so `redo` can return to it.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::scene::Scene;

/// Linear undo/redo history of scene snapshots.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Arc<Scene>>,
    cursor: usize,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    /// Create an empty history retaining at most `max_depth` snapshots.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if no snapshot has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Current cursor position.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Record `scene` after the cursor, discarding any redo snapshots.
    ///
    /// Pushing a scene identical to the one under the cursor only drops the
    /// redo tail.
    pub fn push(&mut self, scene: &Scene) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
            if self.current().is_some_and(|s| s == scene) {
                return;
            }
        }
        self.snapshots.push_back(Arc::new(scene.clone()));
        self.cursor = self.snapshots.len() - 1;
        while self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
    }

    /// Step back. Returns the scene to restore, or `None` at the start of
    /// history.
    pub fn undo(&mut self, live: &Scene) -> Option<Scene> {
        if self.snapshots.is_empty() {
            return None;
        }
        if self.current().is_some_and(|s| s != live) {
            self.push(live);
        }
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.current().cloned()
    }

    /// Step forward. Returns the scene to restore, or `None` at the tail.
    pub fn redo(&mut self) -> Option<Scene> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.current().cloned()
    }

    /// Whether [`undo`](Self::undo) would change `live`.
    #[must_use]
    pub fn can_undo(&self, live: &Scene) -> bool {
        self.cursor > 0 || self.current().is_some_and(|s| s != live)
    }

    /// Whether [`redo`](Self::redo) would change anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Forget everything and start over from `scene`.
    pub fn reset(&mut self, scene: &Scene) {
        self.snapshots.clear();
        self.cursor = 0;
        self.push(scene);
    }

    fn current(&self) -> Option<&Scene> {
        self.snapshots.get(self.cursor).map(AsRef::as_ref)
    }
}
