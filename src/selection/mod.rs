//! Pointer-driven selection of a rectangular region.
//!
//! The engine moves through `Idle → Drafting → Confirming → {Committed | Cancelled}`.
//! While drafting, the rectangle spans the anchor and the pointer, both held
//! inside the container. Once released it is frozen for confirmation, where it
//! can still be moved (clamped to the container) or resized through one of
//! eight handles (rejected when the result would be too small or leave the
//! container).

mod drag;

use egui::{Pos2, Vec2};
use log::{debug, info};

pub use drag::{DragContext, DragKind};

use crate::error::SelectionError;
use crate::geometry::{self, Hit, MIN_DRAFT_SIZE, ResizeHandle, SelectionRect};
use crate::surface::SurfaceRegistry;

/// State of the selection state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    Idle,
    Drafting {
        anchor: Pos2,
        rect: SelectionRect,
    },
    Confirming {
        rect: SelectionRect,
        drag: Option<DragContext>,
        /// Set while a capture of `rect` is in flight.
        suspended: bool,
    },
    Committed(SelectionRect),
    Cancelled,
}

impl SelectionState {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionState::Idle => "idle",
            SelectionState::Drafting { .. } => "drafting",
            SelectionState::Confirming { .. } => "confirming",
            SelectionState::Committed(_) => "committed",
            SelectionState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SelectionState::Committed(_) | SelectionState::Cancelled)
    }
}

/// Result of a resize update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeOutcome {
    Applied(SelectionRect),
    /// The candidate violated the editing limits; the rectangle kept this value.
    Rejected(SelectionRect),
}

impl ResizeOutcome {
    pub fn rect(&self) -> SelectionRect {
        match self {
            ResizeOutcome::Applied(rect) | ResizeOutcome::Rejected(rect) => *rect,
        }
    }
}

/// Interactive selection over one target surface.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    state: SelectionState,
    target_surface: String,
    container: Vec2,
}

impl SelectionEngine {
    pub fn new(target_surface: impl Into<String>, container: Vec2) -> Self {
        Self {
            state: SelectionState::Idle,
            target_surface: target_surface.into(),
            container,
        }
    }

    /// Engine over a registered surface, sized to the surface's logical size.
    pub fn for_surface(surfaces: &SurfaceRegistry, target_surface: &str) -> Result<Self, SelectionError> {
        let surface = surfaces
            .get(target_surface)
            .ok_or_else(|| SelectionError::MissingSurface(target_surface.to_owned()))?;
        let (width, height) = surface.logical_size();
        Ok(Self::new(target_surface, Vec2::new(width as f32, height as f32)))
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn target_surface(&self) -> &str {
        &self.target_surface
    }

    pub fn container_size(&self) -> Vec2 {
        self.container
    }

    pub fn set_container_size(&mut self, size: Vec2) {
        self.container = size;
    }

    /// The rectangle currently shown, in any state that has one.
    pub fn rect(&self) -> Option<SelectionRect> {
        match &self.state {
            SelectionState::Drafting { rect, .. }
            | SelectionState::Confirming { rect, .. }
            | SelectionState::Committed(rect) => Some(*rect),
            SelectionState::Idle | SelectionState::Cancelled => None,
        }
    }

    pub fn drag(&self) -> Option<&DragContext> {
        match &self.state {
            SelectionState::Confirming { drag, .. } => drag.as_ref(),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, SelectionState::Confirming { suspended: false, .. })
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, SelectionState::Confirming { suspended: true, .. })
    }

    /// `point` pulled inside the container.
    fn clamp_to_container(&self, point: Pos2) -> Pos2 {
        Pos2::new(
            point.x.clamp(0.0, self.container.x.max(0.0)),
            point.y.clamp(0.0, self.container.y.max(0.0)),
        )
    }

    fn invalid(&self, operation: &'static str) -> SelectionError {
        SelectionError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    /// Pointer down on the empty overlay: start drafting at `point`.
    pub fn begin(&mut self, point: Pos2) -> Result<(), SelectionError> {
        if self.state != SelectionState::Idle {
            return Err(self.invalid("begin"));
        }
        let point = self.clamp_to_container(point);

        self.state = SelectionState::Drafting {
            anchor: point,
            rect: SelectionRect::spanning(point, point),
        };
        debug!("selection drafting from {:?}", point);
        Ok(())
    }

    /// Pointer moved while drafting. The pointer may leave the container; the
    /// draft stops at its edge.
    pub fn update(&mut self, point: Pos2) -> Result<SelectionRect, SelectionError> {
        let point = self.clamp_to_container(point);
        match &mut self.state {
            SelectionState::Drafting { anchor, rect } => {
                *rect = SelectionRect::spanning(*anchor, point);
                Ok(*rect)
            }
            _ => Err(self.invalid("update")),
        }
    }

    /// Pointer up while drafting.
    ///
    /// A draft below the minimum size is discarded and the engine returns to
    /// `Idle`, reported as [`SelectionError::TooSmall`].
    pub fn release(&mut self) -> Result<SelectionRect, SelectionError> {
        let SelectionState::Drafting { rect, .. } = self.state else {
            return Err(self.invalid("release"));
        };

        if !rect.at_least(MIN_DRAFT_SIZE) {
            self.state = SelectionState::Idle;
            debug!("discarding {}x{} draft as a click", rect.width, rect.height);
            return Err(SelectionError::TooSmall {
                width: rect.width,
                height: rect.height,
            });
        }

        self.state = SelectionState::Confirming {
            rect,
            drag: None,
            suspended: false,
        };
        info!("selection drafted: {:?}", rect);
        Ok(rect)
    }

    fn start_gesture(&mut self, kind: DragKind, pointer: Pos2, operation: &'static str) -> Result<(), SelectionError> {
        match &mut self.state {
            SelectionState::Confirming { suspended: true, .. } => Err(SelectionError::Suspended),
            SelectionState::Confirming { rect, drag, .. } => {
                *drag = Some(DragContext::new(kind, pointer, *rect));
                Ok(())
            }
            _ => Err(self.invalid(operation)),
        }
    }

    pub fn move_start(&mut self, pointer: Pos2) -> Result<(), SelectionError> {
        self.start_gesture(DragKind::Move, pointer, "move")
    }

    pub fn resize_start(&mut self, handle: ResizeHandle, pointer: Pos2) -> Result<(), SelectionError> {
        self.start_gesture(DragKind::Resize(handle), pointer, "resize")
    }

    /// Pointer down on a confirmed selection: start whatever gesture the hit
    /// implies. Returns `None` when the pointer missed the selection.
    pub fn grab(&mut self, pointer: Pos2) -> Result<Option<Hit>, SelectionError> {
        let Some(rect) = self.rect() else {
            return Err(self.invalid("grab"));
        };

        let hit = geometry::hit_test(&rect, pointer, geometry::HANDLE_GRAB_RADIUS);
        match hit {
            Some(Hit::Handle(handle)) => self.resize_start(handle, pointer)?,
            Some(Hit::Body) => self.move_start(pointer)?,
            None => {}
        }
        Ok(hit)
    }

    pub fn move_update(&mut self, pointer: Pos2) -> Result<SelectionRect, SelectionError> {
        let container = self.container;
        match &mut self.state {
            SelectionState::Confirming {
                rect,
                drag: Some(drag),
                suspended: false,
            } if drag.kind == DragKind::Move => {
                *rect = drag.origin.moved_within(drag.delta(pointer), container);
                Ok(*rect)
            }
            _ => Err(self.invalid("move")),
        }
    }

    pub fn resize_update(&mut self, pointer: Pos2) -> Result<ResizeOutcome, SelectionError> {
        let container = self.container;
        match &mut self.state {
            SelectionState::Confirming {
                rect,
                drag: Some(drag),
                suspended: false,
            } => {
                let DragKind::Resize(handle) = drag.kind else {
                    return Err(SelectionError::InvalidTransition {
                        operation: "resize",
                        state: "moving",
                    });
                };

                let candidate = handle.apply(drag.origin, drag.delta(pointer));
                if candidate.is_editable() && candidate.ends_within(container) {
                    *rect = candidate;
                    Ok(ResizeOutcome::Applied(candidate))
                } else {
                    Ok(ResizeOutcome::Rejected(*rect))
                }
            }
            _ => Err(self.invalid("resize")),
        }
    }

    /// Route a pointer move to the active gesture, whichever it is.
    pub fn drag_to(&mut self, pointer: Pos2) -> Result<SelectionRect, SelectionError> {
        match self.drag().map(|drag| drag.kind) {
            Some(DragKind::Move) => self.move_update(pointer),
            Some(DragKind::Resize(_)) => self.resize_update(pointer).map(|outcome| outcome.rect()),
            None if matches!(self.state, SelectionState::Drafting { .. }) => self.update(pointer),
            None => Err(self.invalid("drag")),
        }
    }

    /// Pointer up after a move or resize.
    pub fn end_gesture(&mut self) {
        if let SelectionState::Confirming { drag, .. } = &mut self.state {
            *drag = None;
        }
    }

    /// Accept the selection as it stands.
    pub fn confirm(&mut self) -> Result<SelectionRect, SelectionError> {
        match self.state {
            SelectionState::Confirming { suspended: true, .. } => Err(SelectionError::Suspended),
            SelectionState::Confirming { rect, .. } => {
                self.state = SelectionState::Committed(rect);
                info!("selection committed on {}: {:?}", self.target_surface, rect);
                Ok(rect)
            }
            _ => Err(self.invalid("confirm")),
        }
    }

    /// Freeze the confirmed selection while it is being captured.
    ///
    /// Move and resize gestures are refused until [`Self::capture_finished`].
    pub fn hold_for_capture(&mut self) -> Result<SelectionRect, SelectionError> {
        match &mut self.state {
            SelectionState::Confirming { suspended: true, .. } => Err(SelectionError::Suspended),
            SelectionState::Confirming { rect, drag, suspended } => {
                *drag = None;
                *suspended = true;
                Ok(*rect)
            }
            _ => Err(self.invalid("capture")),
        }
    }

    /// The capture started by [`Self::hold_for_capture`] finished.
    ///
    /// Success commits the selection; failure hands it back for editing.
    pub fn capture_finished(&mut self, succeeded: bool) {
        if let SelectionState::Confirming { rect, suspended, .. } = &mut self.state {
            if !*suspended {
                return;
            }
            if succeeded {
                let rect = *rect;
                self.state = SelectionState::Committed(rect);
                info!("selection committed after capture: {:?}", rect);
            } else {
                *suspended = false;
            }
        }
    }

    /// Abandon the selection from any non-terminal state.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        debug!("selection cancelled from {}", self.state.name());
        self.state = SelectionState::Cancelled;
    }

    /// Start a fresh session after a terminal state.
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }
}
