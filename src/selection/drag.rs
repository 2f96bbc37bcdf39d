use egui::{Pos2, Vec2};

use crate::geometry::{ResizeHandle, SelectionRect};

/// What a confirmed-selection gesture is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize(ResizeHandle),
}

/// Transient state of one pointer gesture on a confirmed selection.
///
/// Every update is computed from `origin` and the pointer's offset from
/// `anchor`, never incrementally, so dropped pointer events cannot drift the
/// rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragContext {
    pub kind: DragKind,
    pub anchor: Pos2,
    pub origin: SelectionRect,
}

impl DragContext {
    pub fn new(kind: DragKind, anchor: Pos2, origin: SelectionRect) -> Self {
        Self {
            kind,
            anchor,
            origin,
        }
    }

    pub fn delta(&self, pointer: Pos2) -> Vec2 {
        pointer - self.anchor
    }

    pub fn handle(&self) -> Option<ResizeHandle> {
        match self.kind {
            DragKind::Move => None,
            DragKind::Resize(handle) => Some(handle),
        }
    }
}
