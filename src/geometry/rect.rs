use egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

/// A freshly drawn selection smaller than this on either axis is a click.
pub const MIN_DRAFT_SIZE: f32 = 10.0;

/// Smallest size a confirmed selection may be resized down to.
pub const MIN_EDIT_SIZE: f32 = 20.0;

/// Slack for float error when comparing an edge against the container.
const EDGE_EPSILON: f32 = 1e-3;

/// Axis-aligned rectangle in container-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Whole-pixel bounds of a rectangle, used for cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SelectionRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The box spanning two corner points, in whatever order they were given.
    pub fn spanning(a: Pos2, b: Pos2) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn min(&self) -> Pos2 {
        pos2(self.left, self.top)
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.width, self.height)
    }

    pub fn center(&self) -> Pos2 {
        pos2(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, point: Pos2) -> bool {
        point.x >= self.left && point.x <= self.right() && point.y >= self.top && point.y <= self.bottom()
    }

    /// Both sides at least `min` long.
    pub fn at_least(&self, min: f32) -> bool {
        self.width >= min && self.height >= min
    }

    /// Whether the rectangle may stand as a confirmed, editable selection.
    pub fn is_editable(&self) -> bool {
        self.at_least(MIN_EDIT_SIZE) && self.left >= 0.0 && self.top >= 0.0
    }

    /// Right and bottom edges stay inside a container of the given size.
    pub fn ends_within(&self, container: Vec2) -> bool {
        self.right() <= container.x + EDGE_EPSILON && self.bottom() <= container.y + EDGE_EPSILON
    }

    /// Translate by `delta`, keeping the rectangle inside a container of the given size.
    pub fn moved_within(&self, delta: Vec2, container: Vec2) -> Self {
        let max_left = (container.x - self.width).max(0.0);
        let max_top = (container.y - self.height).max(0.0);
        Self {
            left: (self.left + delta.x).min(max_left).max(0.0),
            top: (self.top + delta.y).min(max_top).max(0.0),
            ..*self
        }
    }

    /// Same rectangle in another coordinate space whose origin sits at `origin`.
    pub fn translated(&self, origin: Vec2) -> Self {
        Self {
            left: self.left + origin.x,
            top: self.top + origin.y,
            ..*self
        }
    }

    /// Round each edge to the nearest whole pixel. Negative edges snap to zero.
    ///
    /// A rectangle inside a container of whole-pixel size rounds to bounds
    /// inside that container.
    pub fn pixel_bounds(&self) -> PixelBounds {
        let x = self.left.round().max(0.0);
        let y = self.top.round().max(0.0);
        let right = self.right().round().max(x);
        let bottom = self.bottom().round().max(y);
        PixelBounds {
            x: x as u32,
            y: y as u32,
            width: (right - x) as u32,
            height: (bottom - y) as u32,
        }
    }

    pub fn to_egui(&self) -> Rect {
        Rect::from_min_size(self.min(), self.size())
    }
}

impl From<Rect> for SelectionRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect.min.x, rect.min.y, rect.width(), rect.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanning_normalizes_corner_order() {
        let rect = SelectionRect::spanning(pos2(50.0, 80.0), pos2(10.0, 20.0));
        assert_eq!(rect, SelectionRect::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn moved_within_clamps_to_container() {
        let rect = SelectionRect::new(10.0, 10.0, 100.0, 50.0);
        let container = vec2(300.0, 200.0);

        let moved = rect.moved_within(vec2(-500.0, 1000.0), container);
        assert_eq!(moved.left, 0.0);
        assert_eq!(moved.top, 150.0);
        assert_eq!(moved.size(), rect.size());
    }

    #[test]
    fn oversized_rect_pins_to_origin() {
        let rect = SelectionRect::new(5.0, 5.0, 400.0, 50.0);
        let moved = rect.moved_within(vec2(3.0, 0.0), vec2(300.0, 200.0));
        assert_eq!(moved.left, 0.0);
    }

    #[test]
    fn pixel_bounds_round() {
        let bounds = SelectionRect::new(10.4, 19.6, 30.5, 40.2).pixel_bounds();
        assert_eq!(
            bounds,
            PixelBounds {
                x: 10,
                y: 20,
                width: 31,
                height: 40
            }
        );
    }

    #[test]
    fn pixel_bounds_flush_with_the_edge_stay_inside() {
        // 539.5 + 100.5 = 640: rounding the size on its own would reach 641
        let rect = SelectionRect::new(539.5, 379.5, 100.5, 100.5);
        let bounds = rect.pixel_bounds();
        assert_eq!(bounds.x + bounds.width, 640);
        assert_eq!(bounds.y + bounds.height, 480);
        assert_eq!((bounds.width, bounds.height), (100, 100));
    }

    #[test]
    fn ends_within_checks_right_and_bottom() {
        let container = vec2(640.0, 480.0);
        assert!(SelectionRect::new(540.0, 380.0, 100.0, 100.0).ends_within(container));
        assert!(!SelectionRect::new(540.5, 0.0, 100.0, 100.0).ends_within(container));
        assert!(!SelectionRect::new(0.0, 380.0, 100.0, 100.5).ends_within(container));
    }
}
