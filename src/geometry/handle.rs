use egui::{CursorIcon, Pos2, Vec2, pos2};

use super::SelectionRect;

/// One of the eight grab points on a confirmed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

/// Which edges of the rectangle follow the pointer for a given handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub west: bool,
    pub north: bool,
    pub east: bool,
    pub south: bool,
}

impl ResizeHandle {
    /// Corners first so they win hit tests where they overlap an edge handle.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NorthWest,
        ResizeHandle::NorthEast,
        ResizeHandle::SouthWest,
        ResizeHandle::SouthEast,
        ResizeHandle::North,
        ResizeHandle::South,
        ResizeHandle::West,
        ResizeHandle::East,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeHandle::North => "n",
            ResizeHandle::South => "s",
            ResizeHandle::East => "e",
            ResizeHandle::West => "w",
            ResizeHandle::NorthEast => "ne",
            ResizeHandle::NorthWest => "nw",
            ResizeHandle::SouthEast => "se",
            ResizeHandle::SouthWest => "sw",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|handle| handle.as_str() == id)
    }

    pub fn cursor_icon(&self) -> CursorIcon {
        match self {
            ResizeHandle::North => CursorIcon::ResizeNorth,
            ResizeHandle::South => CursorIcon::ResizeSouth,
            ResizeHandle::East => CursorIcon::ResizeEast,
            ResizeHandle::West => CursorIcon::ResizeWest,
            ResizeHandle::NorthEast => CursorIcon::ResizeNorthEast,
            ResizeHandle::NorthWest => CursorIcon::ResizeNorthWest,
            ResizeHandle::SouthEast => CursorIcon::ResizeSouthEast,
            ResizeHandle::SouthWest => CursorIcon::ResizeSouthWest,
        }
    }

    pub fn edges(&self) -> Edges {
        let (west, north, east, south) = match self {
            ResizeHandle::North => (false, true, false, false),
            ResizeHandle::South => (false, false, false, true),
            ResizeHandle::East => (false, false, true, false),
            ResizeHandle::West => (true, false, false, false),
            ResizeHandle::NorthEast => (false, true, true, false),
            ResizeHandle::NorthWest => (true, true, false, false),
            ResizeHandle::SouthEast => (false, false, true, true),
            ResizeHandle::SouthWest => (true, false, false, true),
        };
        Edges {
            west,
            north,
            east,
            south,
        }
    }

    /// Apply a pointer delta to `origin` as if this handle were dragged by it.
    ///
    /// Pure and unvalidated: the caller decides whether the result is acceptable.
    pub fn apply(&self, origin: SelectionRect, delta: Vec2) -> SelectionRect {
        let edges = self.edges();
        let mut rect = origin;

        if edges.west {
            rect.left += delta.x;
            rect.width -= delta.x;
        }
        if edges.east {
            rect.width += delta.x;
        }
        if edges.north {
            rect.top += delta.y;
            rect.height -= delta.y;
        }
        if edges.south {
            rect.height += delta.y;
        }

        rect
    }

    /// Where this handle is drawn on `rect`.
    pub fn position_on(&self, rect: &SelectionRect) -> Pos2 {
        let edges = self.edges();
        let x = if edges.west {
            rect.left
        } else if edges.east {
            rect.right()
        } else {
            rect.left + rect.width / 2.0
        };
        let y = if edges.north {
            rect.top
        } else if edges.south {
            rect.bottom()
        } else {
            rect.top + rect.height / 2.0
        };
        pos2(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    const ORIGIN: SelectionRect = SelectionRect::new(100.0, 100.0, 200.0, 150.0);

    #[test]
    fn south_east_grows_size_only() {
        let rect = ResizeHandle::SouthEast.apply(ORIGIN, vec2(15.0, -5.0));
        assert_eq!(rect, SelectionRect::new(100.0, 100.0, 215.0, 145.0));
    }

    #[test]
    fn north_west_moves_origin_and_shrinks() {
        let rect = ResizeHandle::NorthWest.apply(ORIGIN, vec2(15.0, -5.0));
        assert_eq!(rect, SelectionRect::new(115.0, 95.0, 185.0, 155.0));
    }

    #[test]
    fn edge_handles_ignore_the_other_axis() {
        let delta = vec2(7.0, 11.0);
        assert_eq!(ResizeHandle::East.apply(ORIGIN, delta), SelectionRect { width: 207.0, ..ORIGIN });
        assert_eq!(ResizeHandle::South.apply(ORIGIN, delta), SelectionRect { height: 161.0, ..ORIGIN });
        assert_eq!(
            ResizeHandle::North.apply(ORIGIN, delta),
            SelectionRect { top: 111.0, height: 139.0, ..ORIGIN }
        );
        assert_eq!(
            ResizeHandle::West.apply(ORIGIN, delta),
            SelectionRect { left: 107.0, width: 193.0, ..ORIGIN }
        );
    }

    #[test]
    fn mixed_corners() {
        let delta = vec2(10.0, 20.0);
        assert_eq!(
            ResizeHandle::NorthEast.apply(ORIGIN, delta),
            SelectionRect::new(100.0, 120.0, 210.0, 130.0)
        );
        assert_eq!(
            ResizeHandle::SouthWest.apply(ORIGIN, delta),
            SelectionRect::new(110.0, 100.0, 190.0, 170.0)
        );
    }

    #[test]
    fn zero_delta_is_identity_for_every_handle() {
        for handle in ResizeHandle::ALL {
            assert_eq!(handle.apply(ORIGIN, Vec2::ZERO), ORIGIN, "{}", handle.as_str());
        }
    }

    #[test]
    fn ids_round_trip() {
        for handle in ResizeHandle::ALL {
            assert_eq!(ResizeHandle::from_id(handle.as_str()), Some(handle));
        }
        assert_eq!(ResizeHandle::from_id("x"), None);
    }
}
