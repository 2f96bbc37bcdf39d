use std::sync::Arc;

use egui::{Color32, ColorImage, Pos2, Vec2};
use image::{RgbaImage, imageops};

use super::{BACKGROUND, MagnifierConfig, MagnifierSource, MagnifierView};
use crate::surface::Surface;

struct Snapshot {
    /// The nested surface at `zoom` times its display size.
    zoomed: RgbaImage,
    offset: Vec2,
    display_size: Vec2,
}

/// Takes one zoomed snapshot of the nested surface per session, then pans.
///
/// The snapshot is taken lazily on the first draw. Every later draw only
/// computes a pan offset and copies a `size × size` window, independent of
/// the surface resolution.
pub struct SnapshotMagnifier {
    surface: Arc<dyn Surface>,
    config: MagnifierConfig,
    snapshot: Option<Snapshot>,
    unavailable: bool,
}

impl SnapshotMagnifier {
    pub fn new(surface: Arc<dyn Surface>, config: MagnifierConfig) -> Self {
        Self {
            surface,
            config,
            snapshot: None,
            unavailable: false,
        }
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    fn take_snapshot(&self) -> Option<Snapshot> {
        let nested = self.surface.nested()?;
        let zoom = self.config.zoom;
        let width = (nested.display_size.x * zoom).round();
        let height = (nested.display_size.y * zoom).round();
        if width < 1.0 || height < 1.0 {
            return None;
        }

        let zoomed = imageops::resize(
            nested.backing.as_ref(),
            width as u32,
            height as u32,
            imageops::FilterType::Nearest,
        );
        log::debug!(
            "magnifier snapshot of {}: {}x{}",
            self.surface.id(),
            zoomed.width(),
            zoomed.height()
        );

        Some(Snapshot {
            zoomed,
            offset: nested.offset,
            display_size: nested.display_size,
        })
    }
}

impl MagnifierSource for SnapshotMagnifier {
    fn draw(&mut self, pointer: Pos2) -> MagnifierView {
        let size = self.config.size;

        if self.snapshot.is_none() && !self.unavailable {
            self.snapshot = self.take_snapshot();
            self.unavailable = self.snapshot.is_none();
        }
        let Some(snapshot) = &self.snapshot else {
            return MagnifierView::placeholder(size, pointer);
        };

        let local = pointer - snapshot.offset;
        if local.x < 0.0 || local.y < 0.0 || local.x > snapshot.display_size.x || local.y > snapshot.display_size.y {
            return MagnifierView::placeholder(size, pointer);
        }

        let half = size as f32 / 2.0;
        let pan_x = (local.x * self.config.zoom - half).floor() as i64;
        let pan_y = (local.y * self.config.zoom - half).floor() as i64;
        let (width, height) = (snapshot.zoomed.width() as i64, snapshot.zoomed.height() as i64);

        let mut image = ColorImage::new([size, size], BACKGROUND);
        for y in 0..size {
            let sy = pan_y + y as i64;
            if sy < 0 || sy >= height {
                continue;
            }
            for x in 0..size {
                let sx = pan_x + x as i64;
                if sx < 0 || sx >= width {
                    continue;
                }
                let [r, g, b, a] = snapshot.zoomed.get_pixel(sx as u32, sy as u32).0;
                image[(x, y)] = Color32::from_rgba_unmultiplied(r, g, b, a);
            }
        }

        MagnifierView::sampled(image, pointer)
    }

    fn reset(&mut self) {
        self.snapshot = None;
        self.unavailable = false;
    }
}
