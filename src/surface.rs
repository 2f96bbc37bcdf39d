//! Rendering surfaces that can be captured or magnified.
//!
//! A surface is identified by a string id and renders to pixels at its logical
//! (on-screen) size. A container surface may hold a nested surface whose
//! backing buffer has a different resolution than the area it is displayed in,
//! e.g. a page rasterized at a higher device-pixel ratio.

use std::collections::HashMap;
use std::sync::Arc;

use egui::{Pos2, Rect, Vec2, pos2, vec2};
use image::{Rgba, RgbaImage, imageops};
use parking_lot::RwLock;

use crate::error::CaptureError;

/// Something that can be rendered to a pixel buffer.
pub trait Surface: Send + Sync {
    fn id(&self) -> &str;

    /// On-screen size in logical pixels.
    fn logical_size(&self) -> (u32, u32);

    /// Render the whole surface at 1:1 logical scale.
    ///
    /// The result must be exactly `logical_size()`; crop rectangles are
    /// computed against it.
    fn render(&self) -> Result<RgbaImage, CaptureError>;

    /// The readable pixel surface nested inside this one, if any.
    fn nested(&self) -> Option<&NestedSurface> {
        None
    }
}

/// A backing pixel buffer displayed at some offset and size inside a container.
#[derive(Debug, Clone)]
pub struct NestedSurface {
    /// Top-left corner within the container, in container pixels.
    pub offset: Vec2,
    /// Size the buffer is displayed at, in container pixels.
    pub display_size: Vec2,
    pub backing: Arc<RgbaImage>,
}

impl NestedSurface {
    pub fn new(offset: Vec2, display_size: Vec2, backing: Arc<RgbaImage>) -> Self {
        Self {
            offset,
            display_size,
            backing,
        }
    }

    pub fn display_rect(&self) -> Rect {
        Rect::from_min_size(self.offset.to_pos2(), self.display_size)
    }

    /// Backing pixels per displayed pixel, independently per axis.
    pub fn scale(&self) -> Vec2 {
        vec2(
            self.backing.width() as f32 / self.display_size.x,
            self.backing.height() as f32 / self.display_size.y,
        )
    }

    /// Map a container-relative point to display coordinates inside this surface.
    ///
    /// `None` when the point lies outside the displayed area.
    pub fn to_display(&self, container_point: Pos2) -> Option<Pos2> {
        let local = container_point - self.offset;
        let inside = local.x >= 0.0
            && local.y >= 0.0
            && local.x <= self.display_size.x
            && local.y <= self.display_size.y;
        inside.then_some(local)
    }

    /// Map a container-relative point all the way into backing-buffer coordinates.
    pub fn to_backing(&self, container_point: Pos2) -> Option<Pos2> {
        if self.display_size.x <= 0.0 || self.display_size.y <= 0.0 {
            return None;
        }
        let local = self.to_display(container_point)?;
        let scale = self.scale();
        Some(pos2(local.x * scale.x, local.y * scale.y))
    }

    /// The backing buffer resampled to its displayed size.
    pub fn render_at_display_size(&self) -> RgbaImage {
        let width = self.display_size.x.round().max(1.0) as u32;
        let height = self.display_size.y.round().max(1.0) as u32;
        if self.backing.dimensions() == (width, height) {
            return self.backing.as_ref().clone();
        }
        imageops::resize(self.backing.as_ref(), width, height, imageops::FilterType::Triangle)
    }
}

/// A container of known size with a background and nested raster layers.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    id: String,
    size: (u32, u32),
    background: Rgba<u8>,
    layers: Vec<NestedSurface>,
}

impl RasterSurface {
    pub fn new(id: impl Into<String>, size: (u32, u32)) -> Self {
        Self {
            id: id.into(),
            size,
            background: Rgba([255, 255, 255, 255]),
            layers: Vec::new(),
        }
    }

    pub fn with_background(mut self, background: Rgba<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn with_layer(mut self, layer: NestedSurface) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(&self) -> &[NestedSurface] {
        &self.layers
    }
}

impl Surface for RasterSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn logical_size(&self) -> (u32, u32) {
        self.size
    }

    fn render(&self) -> Result<RgbaImage, CaptureError> {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return Err(CaptureError::RenderFailed {
                surface: self.id.clone(),
                reason: format!("empty surface {}x{}", width, height),
            });
        }

        let mut canvas = RgbaImage::from_pixel(width, height, self.background);
        for layer in &self.layers {
            let pixels = layer.render_at_display_size();
            imageops::overlay(
                &mut canvas,
                &pixels,
                layer.offset.x.round() as i64,
                layer.offset.y.round() as i64,
            );
        }
        Ok(canvas)
    }

    fn nested(&self) -> Option<&NestedSurface> {
        self.layers.first()
    }
}

/// Resolves surface ids to surfaces. Cheap to clone; clones share the table.
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    surfaces: Arc<RwLock<HashMap<String, Arc<dyn Surface>>>>,
}

impl std::fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("surfaces", &self.surfaces.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface under its own id, replacing any previous one.
    pub fn register(&self, surface: Arc<dyn Surface>) {
        let id = surface.id().to_owned();
        log::debug!("registering surface {}", id);
        self.surfaces.write().insert(id, surface);
    }

    pub fn remove(&self, id: &str) -> Option<Arc<dyn Surface>> {
        self.surfaces.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Surface>> {
        self.surfaces.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        })
    }

    #[test]
    fn scale_is_per_axis() {
        let nested = NestedSurface::new(vec2(10.0, 20.0), vec2(100.0, 50.0), Arc::new(checker(200, 150)));
        assert_eq!(nested.scale(), vec2(2.0, 3.0));
        assert_eq!(nested.to_backing(pos2(60.0, 30.0)), Some(pos2(100.0, 30.0)));
        assert_eq!(nested.to_backing(pos2(5.0, 30.0)), None);
        assert_eq!(nested.to_backing(pos2(60.0, 71.0)), None);
    }

    #[test]
    fn render_matches_logical_size_and_places_layers() {
        let layer = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 255, 255]));
        let surface = RasterSurface::new("viewer", (100, 80))
            .with_layer(NestedSurface::new(vec2(10.0, 5.0), vec2(20.0, 20.0), Arc::new(layer)));

        let render = surface.render().unwrap();
        assert_eq!(render.dimensions(), (100, 80));
        assert_eq!(render.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(render.get_pixel(10, 5), &Rgba([0, 0, 255, 255]));
        assert_eq!(render.get_pixel(29, 24), &Rgba([0, 0, 255, 255]));
        assert_eq!(render.get_pixel(30, 25), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn empty_surface_fails_to_render() {
        let surface = RasterSurface::new("viewer", (0, 10));
        assert!(matches!(surface.render(), Err(CaptureError::RenderFailed { .. })));
    }

    #[test]
    fn registry_resolves_by_id() {
        let registry = SurfaceRegistry::new();
        registry.register(Arc::new(RasterSurface::new("a", (1, 1))));
        assert!(registry.get("a").is_some());
        assert!(registry.get("b").is_none());
        assert!(registry.remove("a").is_some());
        assert!(registry.get("a").is_none());
    }
}
