//! Container-relative selection geometry.
//!
//! Everything here is pure: no state, no I/O. The selection engine composes
//! these pieces into its pointer state machine.

mod handle;
pub mod hit_testing;
mod rect;

pub use handle::{Edges, ResizeHandle};
pub use hit_testing::{Hit, HANDLE_GRAB_RADIUS, hit_test};
pub use rect::{MIN_DRAFT_SIZE, MIN_EDIT_SIZE, PixelBounds, SelectionRect};
