//! Revocable references to encoded capture images.
//!
//! A [`PreviewRef`] is a handle into a [`PreviewStore`], playing the part of an
//! object URL: it stays valid until someone revokes it, and every holder
//! sees the revocation. The store also uploads previews as egui textures on
//! first display and drops the texture with the reference.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::capture::ImageEncoding;

/// Errors that can occur while displaying a preview
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("preview {0} has been revoked")]
    Revoked(Uuid),
    #[error("failed to decode preview: {0}")]
    DecodeFailed(#[from] image::ImageError),
}

/// Handle to an encoded image held by a [`PreviewStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef {
    id: Uuid,
}

impl PreviewRef {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// URL-style name, for logs and texture names.
    pub fn url(&self) -> String {
        format!("preview:{}", self.id)
    }
}

struct PreviewEntry {
    bytes: Bytes,
    encoding: ImageEncoding,
    texture: Option<TextureHandle>,
}

/// Shared table of live previews. Clones share the same table.
#[derive(Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, PreviewEntry>>>,
}

impl std::fmt::Debug for PreviewStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewStore")
            .field("live", &self.len())
            .finish()
    }
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, bytes: Bytes, encoding: ImageEncoding) -> PreviewRef {
        let id = Uuid::new_v4();
        self.entries.lock().insert(
            id,
            PreviewEntry {
                bytes,
                encoding,
                texture: None,
            },
        );
        PreviewRef { id }
    }

    /// Release the reference. Returns `false` if it was already revoked.
    pub fn revoke(&self, preview: &PreviewRef) -> bool {
        let removed = self.entries.lock().remove(&preview.id).is_some();
        if removed {
            log::debug!("revoked {}", preview.url());
        }
        removed
    }

    pub fn is_live(&self, preview: &PreviewRef) -> bool {
        self.entries.lock().contains_key(&preview.id)
    }

    pub fn bytes(&self, preview: &PreviewRef) -> Option<Bytes> {
        self.entries.lock().get(&preview.id).map(|entry| entry.bytes.clone())
    }

    pub fn encoding(&self, preview: &PreviewRef) -> Option<ImageEncoding> {
        self.entries.lock().get(&preview.id).map(|entry| entry.encoding)
    }

    /// Number of live references.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Texture for a live preview, decoding and uploading it on first use.
    pub fn texture(&self, ctx: &Context, preview: &PreviewRef) -> Result<TextureId, PreviewError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&preview.id)
            .ok_or(PreviewError::Revoked(preview.id))?;

        if let Some(handle) = &entry.texture {
            return Ok(handle.id());
        }

        let decoded = image::load_from_memory(&entry.bytes)?.to_rgba8();
        let size = [decoded.width() as usize, decoded.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, decoded.as_flat_samples().as_slice());
        let handle = ctx.load_texture(preview.url(), image, TextureOptions::LINEAR);
        let id = handle.id();
        entry.texture = Some(handle);
        Ok(id)
    }
}

/// The single preview currently displayed by one UI element.
///
/// Showing a new preview or clearing the slot revokes the previous one;
/// [`PreviewSlot::take`] hands the obligation to the caller instead.
#[derive(Debug)]
pub struct PreviewSlot {
    store: PreviewStore,
    current: Option<PreviewRef>,
}

impl PreviewSlot {
    pub fn new(store: PreviewStore) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&PreviewRef> {
        self.current.as_ref()
    }

    pub fn show(&mut self, preview: PreviewRef) {
        if let Some(previous) = self.current.replace(preview) {
            if Some(&previous) != self.current.as_ref() {
                self.store.revoke(&previous);
            }
        }
    }

    /// Give up the displayed preview without revoking it.
    pub fn take(&mut self) -> Option<PreviewRef> {
        self.current.take()
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            self.store.revoke(&previous);
        }
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
