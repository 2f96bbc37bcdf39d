use std::sync::Arc;

use egui::{Color32, ColorImage, Pos2};

use super::{BACKGROUND, MagnifierConfig, MagnifierSource, MagnifierView};
use crate::surface::Surface;

/// Resamples the nested surface's backing buffer on every draw.
///
/// Always shows current pixels, at the cost of touching the surface for
/// every frame.
pub struct LiveMagnifier {
    surface: Arc<dyn Surface>,
    config: MagnifierConfig,
}

impl LiveMagnifier {
    pub fn new(surface: Arc<dyn Surface>, config: MagnifierConfig) -> Self {
        Self { surface, config }
    }
}

impl MagnifierSource for LiveMagnifier {
    fn draw(&mut self, pointer: Pos2) -> MagnifierView {
        let size = self.config.size;
        let zoom = self.config.zoom;
        if zoom <= 0.0 {
            return MagnifierView::placeholder(size, pointer);
        }

        let Some(nested) = self.surface.nested() else {
            log::trace!("surface {} has nothing to magnify", self.surface.id());
            return MagnifierView::placeholder(size, pointer);
        };
        let Some(center) = nested.to_backing(pointer) else {
            return MagnifierView::placeholder(size, pointer);
        };

        let scale = nested.scale();
        let backing = nested.backing.as_ref();
        let (width, height) = (backing.width() as f32, backing.height() as f32);
        let half = size as f32 / 2.0;

        let mut image = ColorImage::new([size, size], BACKGROUND);
        for y in 0..size {
            let sy = center.y + (y as f32 + 0.5 - half) / zoom * scale.y;
            if sy < 0.0 || sy >= height {
                continue;
            }
            for x in 0..size {
                let sx = center.x + (x as f32 + 0.5 - half) / zoom * scale.x;
                if sx < 0.0 || sx >= width {
                    continue;
                }
                let [r, g, b, a] = backing.get_pixel(sx as u32, sy as u32).0;
                image[(x, y)] = Color32::from_rgba_unmultiplied(r, g, b, a);
            }
        }

        MagnifierView::sampled(image, pointer)
    }
}
