//! Loading documents to view, from the command line or dropped onto the window.

use std::path::Path;
use std::sync::Arc;

use eframe::egui;
use image::RgbaImage;

use crate::error::DocumentError;

/// A decoded document page.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub name: String,
    pub pixels: Arc<RgbaImage>,
}

pub fn load_document(path: &Path) -> Result<LoadedDocument, DocumentError> {
    let name = path.display().to_string();
    if !is_image_path(path) {
        return Err(DocumentError::Unsupported(name));
    }
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Read {
        path: name.clone(),
        source,
    })?;
    decode_document(name, &bytes)
}

pub fn decode_document(name: String, bytes: &[u8]) -> Result<LoadedDocument, DocumentError> {
    let pixels = image::load_from_memory(bytes)?.to_rgba8();
    log::info!("loaded {} ({}x{})", name, pixels.width(), pixels.height());
    Ok(LoadedDocument {
        name,
        pixels: Arc::new(pixels),
    })
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg"))
}

/// Picks up files dropped onto the window.
#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect files dropped this frame. Returns true if there are any.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
            }
        });
        !self.dropped_files.is_empty()
    }

    /// Decode the first usable dropped file, discarding the rest.
    pub fn take_document(&mut self) -> Option<Result<LoadedDocument, DocumentError>> {
        let file = self.dropped_files.drain(..).next()?;
        let name = if let Some(path) = &file.path {
            path.display().to_string()
        } else if !file.name.is_empty() {
            file.name.clone()
        } else {
            "unknown".to_owned()
        };

        if !file.mime.is_empty() && !file.mime.starts_with("image/") {
            return Some(Err(DocumentError::Unsupported(name)));
        }

        let result = if let Some(bytes) = &file.bytes {
            decode_document(name, bytes)
        } else if let Some(path) = &file.path {
            load_document(path)
        } else {
            Err(DocumentError::NoData(name))
        };
        Some(result)
    }

    /// Dim the window while files are dragged over it.
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, FontId, Id, LayerId, Order};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            "Drop an image to open it",
            FontId::proportional(24.0),
            Color32::WHITE,
        );
    }
}
