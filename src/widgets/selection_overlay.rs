use egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use crate::geometry::{ResizeHandle, SelectionRect};

const SHADE: Color32 = Color32::from_black_alpha(96);
const OUTLINE: Color32 = Color32::from_rgb(30, 120, 255);
const HANDLE_SIZE: f32 = 8.0;

/// Paints a selection rectangle over the viewer: the surroundings dimmed, an
/// outline, and the eight resize handles once the rectangle is editable.
pub struct SelectionOverlay {
    /// Screen position of the container's top-left corner.
    origin: Pos2,
    container: Rect,
}

impl SelectionOverlay {
    pub fn new(container: Rect) -> Self {
        Self {
            origin: container.min,
            container,
        }
    }

    fn to_screen(&self, rect: &SelectionRect) -> Rect {
        rect.translated(self.origin.to_vec2()).to_egui()
    }

    /// Dim the whole container, for when nothing is selected yet.
    pub fn paint_empty(&self, painter: &Painter) {
        painter.rect_filled(self.container, 0.0, SHADE);
    }

    pub fn paint(&self, painter: &Painter, rect: &SelectionRect, with_handles: bool) {
        let selected = self.to_screen(rect);
        let container = self.container;

        // Shade the four bands around the selection.
        let bands = [
            Rect::from_min_max(container.min, Pos2::new(container.max.x, selected.min.y)),
            Rect::from_min_max(Pos2::new(container.min.x, selected.max.y), container.max),
            Rect::from_min_max(
                Pos2::new(container.min.x, selected.min.y),
                Pos2::new(selected.min.x, selected.max.y),
            ),
            Rect::from_min_max(
                Pos2::new(selected.max.x, selected.min.y),
                Pos2::new(container.max.x, selected.max.y),
            ),
        ];
        for band in bands {
            let band = band.intersect(container);
            if band.is_positive() {
                painter.rect_filled(band, 0.0, SHADE);
            }
        }

        painter.rect_stroke(selected, 0.0, Stroke::new(2.0, OUTLINE));

        if with_handles {
            for handle in ResizeHandle::ALL {
                let center = handle.position_on(rect) + self.origin.to_vec2();
                let square = Rect::from_center_size(center, Vec2::splat(HANDLE_SIZE));
                painter.rect_filled(square, 2.0, OUTLINE);
                painter.rect_stroke(square, 2.0, Stroke::new(1.0, Color32::WHITE));
            }
        }
    }

    /// Label with the selection size, drawn just above it.
    pub fn paint_size_label(&self, painter: &Painter, rect: &SelectionRect) {
        let selected = self.to_screen(rect);
        let bounds = rect.pixel_bounds();
        painter.text(
            selected.left_top() - Vec2::new(0.0, 4.0),
            egui::Align2::LEFT_BOTTOM,
            format!("{} × {}", bounds.width, bounds.height),
            egui::FontId::monospace(12.0),
            Color32::WHITE,
        );
    }
}
