//! List ordering: pure reorder/renumber functions and the drag state machine
//! that mirrors a subscribed sequence while the user rearranges it.

mod drag;
mod reorder;

pub use drag::{DragState, InvalidItemHeight, ReorderList};
pub use reorder::{move_item, next_set_number, reindex, renumber_after_delete, Positioned};
