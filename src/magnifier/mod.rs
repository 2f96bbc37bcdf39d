//! Zoomed preview of the pixels under the pointer while a selection is drawn.
//!
//! Two sources implement [`MagnifierSource`]: [`LiveMagnifier`] resamples the
//! nested surface on every draw, [`SnapshotMagnifier`] takes one zoomed
//! snapshot per session and afterwards only pans over it. [`Magnifier`] wraps
//! either one and limits drawing to once per displayed frame.

mod live;
mod placement;
mod snapshot;

use std::sync::Arc;

use egui::{Color32, ColorImage, Pos2};
use serde::{Deserialize, Serialize};

pub use live::LiveMagnifier;
pub use placement::popup_position;
pub use snapshot::SnapshotMagnifier;

use crate::surface::Surface;

const BACKGROUND: Color32 = Color32::WHITE;
const PLACEHOLDER: Color32 = Color32::from_rgb(240, 240, 240);
const CROSSHAIR: Color32 = Color32::from_rgb(255, 0, 0);
const CENTER_DOT_RADIUS: i64 = 2;

/// Which sampling strategy backs the magnifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnifierVariant {
    Live,
    #[default]
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnifierConfig {
    /// Side length of the square preview, in pixels.
    pub size: usize,
    pub zoom: f32,
    /// Gap between the pointer and the popup.
    pub popup_offset: f32,
    pub variant: MagnifierVariant,
}

impl Default for MagnifierConfig {
    fn default() -> Self {
        Self {
            size: 140,
            zoom: 3.0,
            popup_offset: 15.0,
            variant: MagnifierVariant::default(),
        }
    }
}

/// One drawn magnifier frame.
#[derive(Clone)]
pub struct MagnifierView {
    pub image: ColorImage,
    /// Container-relative pointer the frame is centered on.
    pub pointer: Pos2,
    /// No pixels could be sampled; `image` is the placeholder.
    pub placeholder: bool,
}

impl std::fmt::Debug for MagnifierView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagnifierView")
            .field("size", &self.image.size)
            .field("pointer", &self.pointer)
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

impl MagnifierView {
    pub(crate) fn sampled(mut image: ColorImage, pointer: Pos2) -> Self {
        draw_crosshair(&mut image);
        Self {
            image,
            pointer,
            placeholder: false,
        }
    }

    pub(crate) fn placeholder(size: usize, pointer: Pos2) -> Self {
        let mut image = ColorImage::new([size, size], PLACEHOLDER);
        draw_crosshair(&mut image);
        Self {
            image,
            pointer,
            placeholder: true,
        }
    }
}

/// Produces magnified frames for container-relative pointer positions.
pub trait MagnifierSource: Send {
    fn draw(&mut self, pointer: Pos2) -> MagnifierView;

    /// Drop anything cached for the current selection session.
    fn reset(&mut self) {}
}

fn draw_crosshair(image: &mut ColorImage) {
    let [width, height] = image.size;
    let (cx, cy) = (width / 2, height / 2);

    for y in 0..height {
        image[(cx, y)] = CROSSHAIR;
    }
    for x in 0..width {
        image[(x, cy)] = CROSSHAIR;
    }

    let r = CENTER_DOT_RADIUS;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let x = cx as i64 + dx;
            let y = cy as i64 + dy;
            if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
                image[(x as usize, y as usize)] = CROSSHAIR;
            }
        }
    }
}

/// Frame-gated magnifier.
///
/// Pointer moves only record the latest position; [`Magnifier::frame`] is
/// called once per displayed frame and draws only if the pointer moved since
/// the previous one.
pub struct Magnifier {
    source: Box<dyn MagnifierSource>,
    pending: Option<Pos2>,
    current: Option<MagnifierView>,
    draws: u64,
}

impl std::fmt::Debug for Magnifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Magnifier")
            .field("pending", &self.pending)
            .field("current", &self.current)
            .field("draws", &self.draws)
            .finish_non_exhaustive()
    }
}

impl Magnifier {
    pub fn new(source: Box<dyn MagnifierSource>) -> Self {
        Self {
            source,
            pending: None,
            current: None,
            draws: 0,
        }
    }

    /// Magnifier over `surface` using the source `config` selects.
    pub fn for_surface(surface: Arc<dyn Surface>, config: &MagnifierConfig) -> Self {
        let source: Box<dyn MagnifierSource> = match config.variant {
            MagnifierVariant::Live => Box::new(LiveMagnifier::new(surface, config.clone())),
            MagnifierVariant::Snapshot => Box::new(SnapshotMagnifier::new(surface, config.clone())),
        };
        Self::new(source)
    }

    pub fn pointer_moved(&mut self, pointer: Pos2) {
        self.pending = Some(pointer);
    }

    /// Draw at most once, for the latest pointer position.
    pub fn frame(&mut self) -> Option<&MagnifierView> {
        if let Some(pointer) = self.pending.take() {
            self.current = Some(self.source.draw(pointer));
            self.draws += 1;
        }
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&MagnifierView> {
        self.current.as_ref()
    }

    /// Whether a draw is waiting for the next frame.
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Hide the preview and forget the session's snapshot.
    pub fn end_session(&mut self) {
        self.pending = None;
        self.current = None;
        self.source.reset();
    }
}
