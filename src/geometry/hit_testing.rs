use egui::Pos2;

use super::{ResizeHandle, SelectionRect};

/// How close (in container pixels) the pointer must be to grab a handle.
pub const HANDLE_GRAB_RADIUS: f32 = 8.0;

/// What lies under the pointer on a confirmed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Handle(ResizeHandle),
    Body,
}

pub fn hit_test(rect: &SelectionRect, pos: Pos2, radius: f32) -> Option<Hit> {
    // Handles sit half outside the rectangle, so test them before the body.
    for handle in ResizeHandle::ALL {
        let distance = pos.distance(handle.position_on(rect));
        if distance <= radius {
            log::trace!("hit handle {} at distance {}", handle.as_str(), distance);
            return Some(Hit::Handle(handle));
        }
    }

    rect.contains(pos).then_some(Hit::Body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn corners_and_edges() {
        let rect = SelectionRect::new(0.0, 0.0, 100.0, 60.0);
        assert_eq!(
            hit_test(&rect, pos2(2.0, 1.0), HANDLE_GRAB_RADIUS),
            Some(Hit::Handle(ResizeHandle::NorthWest))
        );
        assert_eq!(
            hit_test(&rect, pos2(103.0, 62.0), HANDLE_GRAB_RADIUS),
            Some(Hit::Handle(ResizeHandle::SouthEast))
        );
        assert_eq!(
            hit_test(&rect, pos2(50.0, 58.0), HANDLE_GRAB_RADIUS),
            Some(Hit::Handle(ResizeHandle::South))
        );
        assert_eq!(hit_test(&rect, pos2(30.0, 30.0), HANDLE_GRAB_RADIUS), Some(Hit::Body));
        assert_eq!(hit_test(&rect, pos2(300.0, 30.0), HANDLE_GRAB_RADIUS), None);
    }
}
