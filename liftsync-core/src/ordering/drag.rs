use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use super::reorder::{move_item, reindex, Positioned};

/// Gesture state of a [`ReorderList`].
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        start_index: usize,
        current_index: usize,
        /// Accumulated drag distance not yet turned into a move.
        offset: f32,
    },
}

/// Row height rejected by [`ReorderList::new`].
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Item height must be a positive number, got {0}")]
pub struct InvalidItemHeight(pub f32);

/// Local mirror of a subscribed sequence that the user can rearrange by drag.
///
/// Remote snapshots are mirrored only while idle and once the settle delay
/// after the last gesture has passed; until then the newest one is held back.
/// Time is passed in explicitly so the machine stays synchronous.
#[derive(Debug, Clone)]
pub struct ReorderList<T> {
    items: Vec<T>,
    remote: Vec<T>,
    stale: bool,
    state: DragState,
    item_height: f32,
    settle_delay: Duration,
    resume_at: Option<Instant>,
}

impl<T: Positioned + Clone> ReorderList<T> {
    /// `item_height` must be finite and greater than zero.
    pub fn new(item_height: f32, settle_delay: Duration) -> Result<Self, InvalidItemHeight> {
        if !item_height.is_finite() || item_height <= 0.0 {
            return Err(InvalidItemHeight(item_height));
        }
        Ok(Self {
            items: Vec::new(),
            remote: Vec::new(),
            stale: false,
            state: DragState::Idle,
            item_height,
            settle_delay,
            resume_at: None,
        })
    }

    /// The sequence as currently rendered.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Whether a remote snapshot is waiting to be mirrored.
    pub fn has_pending(&self) -> bool {
        self.stale
    }

    /// Records a subscription snapshot and mirrors it if allowed at `now`.
    pub fn on_remote(&mut self, snapshot: Vec<T>, now: Instant) -> bool {
        self.remote = snapshot;
        self.stale = true;
        self.tick(now)
    }

    /// Mirrors the held-back snapshot once idle and settled. Returns whether
    /// the rendered sequence was replaced.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.is_dragging() || !self.stale {
            return false;
        }
        if let Some(at) = self.resume_at {
            if now < at {
                return false;
            }
            self.resume_at = None;
        }
        self.items = self.remote.clone();
        self.stale = false;
        true
    }

    pub fn drag_start(&mut self, index: usize) -> bool {
        if index >= self.items.len() || self.is_dragging() {
            return false;
        }
        self.state = DragState::Dragging {
            start_index: index,
            current_index: index,
            offset: 0.0,
        };
        true
    }

    /// Adds `dy` to the drag offset and relocates the dragged item for every
    /// whole item height crossed. Returns the new index when the item moved.
    ///
    /// Every crossed height is consumed once the item moves, including the
    /// part beyond the first or last row.
    pub fn drag_move(&mut self, dy: f32) -> Option<usize> {
        if !dy.is_finite() {
            return None;
        }
        let DragState::Dragging {
            current_index,
            offset,
            ..
        } = &mut self.state
        else {
            return None;
        };

        *offset += dy;
        let steps = (*offset / self.item_height) as i64;
        let last = self.items.len() as i64 - 1;
        let target = (*current_index as i64).saturating_add(steps).clamp(0, last) as usize;
        if target == *current_index {
            return None;
        }

        *current_index = move_item(&mut self.items, *current_index, target);
        // Keep the sub-item remainder so continuous drags stay smooth.
        *offset -= steps as f32 * self.item_height;
        Some(target)
    }

    /// Ends the gesture and returns the items whose persisted position must
    /// change, already renumbered. Mirroring resumes after the settle delay.
    pub fn drag_end(&mut self, now: Instant) -> Vec<T> {
        let DragState::Dragging {
            start_index,
            current_index,
            ..
        } = std::mem::replace(&mut self.state, DragState::Idle)
        else {
            return Vec::new();
        };
        self.resume_at = Some(now + self.settle_delay);

        if start_index == current_index {
            return Vec::new();
        }
        let changed = reindex(&mut self.items, 0);
        debug!(
            "Drag {} -> {} changed {} positions",
            start_index,
            current_index,
            changed.len()
        );
        changed
    }

    /// Aborts the gesture. The pre-drag arrangement comes back with the next
    /// mirror after the settle delay.
    pub fn drag_cancel(&mut self, now: Instant) {
        if !self.is_dragging() {
            return;
        }
        self.state = DragState::Idle;
        self.stale = true;
        self.resume_at = Some(now + self.settle_delay);
    }
}
