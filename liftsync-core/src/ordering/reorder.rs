use crate::models::{Exercise, WorkoutSet};

/// An item with a persisted position within its parent collection.
pub trait Positioned {
    fn key(&self) -> &str;

    fn position(&self) -> Option<i32>;

    fn set_position(&mut self, position: i32);
}

impl Positioned for Exercise {
    fn key(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Option<i32> {
        self.order
    }

    fn set_position(&mut self, position: i32) {
        self.order = Some(position);
    }
}

impl Positioned for WorkoutSet {
    fn key(&self) -> &str {
        &self.id
    }

    fn position(&self) -> Option<i32> {
        Some(self.set_number)
    }

    fn set_position(&mut self, position: i32) {
        self.set_number = position;
    }
}

/// Moves the item at `from` to `to` (clamped to the last index) and returns
/// the index it landed on. Out-of-range `from` leaves the list untouched.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> usize {
    if from >= items.len() {
        return from;
    }
    let to = to.min(items.len() - 1);
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    to
}

/// Assigns `base + index` to every item and returns copies of the items whose
/// position actually changed.
pub fn reindex<T: Positioned + Clone>(items: &mut [T], base: i32) -> Vec<T> {
    let mut changed = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let position = base + index as i32;
        if item.position() != Some(position) {
            item.set_position(position);
            changed.push(item.clone());
        }
    }
    changed
}

/// Removes `key` and renumbers the rest from 1.
///
/// Returns `(remaining, changed)`; `changed` holds only the items whose
/// number moved.
pub fn renumber_after_delete<T>(items: &[T], key: &str) -> (Vec<T>, Vec<T>)
where
    T: Positioned + Clone,
{
    let mut remaining: Vec<T> = items.iter().filter(|i| i.key() != key).cloned().collect();
    let changed = reindex(&mut remaining, 1);
    (remaining, changed)
}

/// Number for a set appended to `sets`.
pub fn next_set_number(sets: &[WorkoutSet]) -> i32 {
    sets.len() as i32 + 1
}
