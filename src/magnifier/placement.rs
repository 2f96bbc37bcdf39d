use egui::{Pos2, Rect, Vec2, pos2};

/// Screen position of the magnifier popup for a pointer.
///
/// The popup sits `offset` below and right of the pointer, flipping to the
/// other side on each axis where it would leave `viewport`.
pub fn popup_position(pointer: Pos2, size: Vec2, offset: f32, viewport: Rect) -> Pos2 {
    let mut x = pointer.x + offset;
    if x + size.x > viewport.max.x {
        x = pointer.x - size.x - offset;
    }

    let mut y = pointer.y + offset;
    if y + size.y > viewport.max.y {
        y = pointer.y - size.y - offset;
    }

    pos2(x, y)
}
