use egui::{Color32, Id, Key, LayerId, Order, Pos2, Rect, Sense, Stroke, TextureOptions, Ui, pos2, vec2};

use crate::SnipAskApp;
use crate::geometry::{self, Hit, SelectionRect};
use crate::magnifier::popup_position;
use crate::selection::{DragKind, SelectionState};
use crate::widgets::SelectionOverlay;

pub fn viewer_panel(app: &mut SnipAskApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        toolbar(app, ui);
        ui.separator();

        let container = ui.available_rect_before_wrap();
        app.layout_viewer(container.size());

        let response = ui.allocate_rect(container, Sense::click_and_drag());
        let painter = ui.painter_at(container);
        painter.rect_filled(container, 0.0, Color32::from_gray(48));
        if let (Some(texture), Some(page)) = (&app.view.texture, app.view.page()) {
            let page_rect = page.display_rect().translate(container.min.to_vec2());
            painter.image(
                texture.id(),
                page_rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            painter.text(
                container.center(),
                egui::Align2::CENTER_CENTER,
                "Drop an image here to open it",
                egui::FontId::proportional(18.0),
                Color32::GRAY,
            );
        }

        if app.selection.is_some() {
            handle_selection_input(app, ctx, &response, container);
            paint_selection(app, ctx, ui, container);
        }
    });
}

fn toolbar(app: &mut SnipAskApp, ui: &mut Ui) {
    ui.horizontal(|ui| {
        let idle = app.selection.is_none() && !app.capture_in_flight();
        if ui.add_enabled(idle, egui::Button::new("Select area")).clicked() {
            app.start_selection();
        }
        if ui.add_enabled(idle, egui::Button::new("Capture page")).clicked() {
            app.capture_page();
        }

        match app.selection_state() {
            Some(SelectionState::Confirming { suspended: false, .. }) => {
                if ui.button("Use selection").clicked() {
                    app.capture_selection();
                }
                if ui.button("Cancel").clicked() {
                    app.cancel_selection();
                }
            }
            Some(SelectionState::Confirming { suspended: true, .. }) => {
                ui.spinner();
                ui.label("Capturing…");
            }
            Some(_) => {
                ui.label("Drag to select an area, Esc to cancel");
                if ui.button("Cancel").clicked() {
                    app.cancel_selection();
                }
            }
            None if app.capture_in_flight() => {
                ui.spinner();
            }
            None => {}
        }

        if let Some(document) = &app.view.document {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.weak(&document.name);
            });
        }
    });
}

fn handle_selection_input(app: &mut SnipAskApp, ctx: &egui::Context, response: &egui::Response, container: Rect) {
    if ctx.input(|i| i.key_pressed(Key::Escape)) {
        app.cancel_selection();
        return;
    }
    if ctx.input(|i| i.key_pressed(Key::Enter)) {
        if app.selection.as_ref().is_some_and(|selection| selection.engine.is_editing()) {
            app.capture_selection();
        }
        return;
    }

    let to_local = |pos: Pos2| pos2(pos.x - container.min.x, pos.y - container.min.y);
    let pointer = response
        .interact_pointer_pos()
        .or_else(|| response.hover_pos())
        .map(to_local);

    let mut error = None;
    if let Some(selection) = &mut app.selection {
        let engine = &mut selection.engine;

        if let Some(pointer) = pointer {
            if response.drag_started() {
                // The gesture starts where the button went down, not where the
                // drag threshold was crossed.
                let origin = ctx
                    .input(|i| i.pointer.press_origin())
                    .map(to_local)
                    .unwrap_or(pointer);
                let idle = *engine.state() == SelectionState::Idle;
                let started = if idle {
                    engine.begin(origin)
                } else if engine.is_editing() {
                    engine.grab(origin).map(|_| ())
                } else {
                    Ok(())
                };
                error = started.err();
            }
            if response.dragged()
                && (engine.drag().is_some() || matches!(engine.state(), SelectionState::Drafting { .. }))
            {
                error = engine.drag_to(pointer).err().or(error);
            }
        }

        if response.drag_stopped() {
            if matches!(engine.state(), SelectionState::Drafting { .. }) {
                error = engine.release().err();
            } else {
                engine.end_gesture();
            }
        }

        if let Some(pointer) = pointer {
            let magnify = match engine.state() {
                SelectionState::Idle | SelectionState::Drafting { .. } => true,
                SelectionState::Confirming { .. } => matches!(
                    engine.drag().map(|drag| drag.kind),
                    Some(DragKind::Resize(_))
                ),
                _ => false,
            };
            if magnify && (response.hovered() || response.dragged()) {
                selection.magnifier.pointer_moved(pointer);
            }
            set_cursor(ctx, engine.state(), engine.rect(), pointer);
        }
    }

    if let Some(err) = error {
        app.report_selection_error(err);
    }
}

fn set_cursor(ctx: &egui::Context, state: &SelectionState, rect: Option<SelectionRect>, pointer: Pos2) {
    let icon = match (state, rect) {
        (SelectionState::Confirming { suspended: false, drag, .. }, Some(rect)) => match drag.as_ref().map(|d| d.kind) {
            Some(DragKind::Resize(handle)) => handle.cursor_icon(),
            Some(DragKind::Move) => egui::CursorIcon::Grabbing,
            None => match geometry::hit_test(&rect, pointer, geometry::HANDLE_GRAB_RADIUS) {
                Some(Hit::Handle(handle)) => handle.cursor_icon(),
                Some(Hit::Body) => egui::CursorIcon::Grab,
                None => egui::CursorIcon::Default,
            },
        },
        (SelectionState::Confirming { suspended: true, .. }, _) => egui::CursorIcon::Wait,
        _ => egui::CursorIcon::Crosshair,
    };
    ctx.set_cursor_icon(icon);
}

fn paint_selection(app: &mut SnipAskApp, ctx: &egui::Context, ui: &Ui, container: Rect) {
    let Some(selection) = &mut app.selection else {
        return;
    };
    let painter = ui.painter_at(container);
    let overlay = SelectionOverlay::new(container);
    match selection.engine.rect() {
        Some(rect) => {
            overlay.paint(&painter, &rect, selection.engine.is_editing());
            overlay.paint_size_label(&painter, &rect);
        }
        None => overlay.paint_empty(&painter),
    }

    let dragging_resize = matches!(
        selection.engine.drag().map(|drag| drag.kind),
        Some(DragKind::Resize(_))
    );
    let show_magnifier = matches!(
        selection.engine.state(),
        SelectionState::Idle | SelectionState::Drafting { .. }
    ) || dragging_resize;
    if !show_magnifier {
        return;
    }

    let hovering = ctx
        .pointer_hover_pos()
        .is_some_and(|pos| container.contains(pos));
    if !hovering && !dragging_resize {
        return;
    }

    let config = &app.config.magnifier;
    let Some((image, pointer)) = selection
        .magnifier
        .frame()
        .map(|view| (view.image.clone(), view.pointer))
    else {
        return;
    };
    let draws = selection.magnifier.draw_count();

    let texture = match &mut selection.magnifier_texture {
        Some(texture) => {
            if selection.magnifier_draws != draws {
                texture.set(image, TextureOptions::NEAREST);
            }
            texture.clone()
        }
        None => {
            let texture = ctx.load_texture("magnifier", image, TextureOptions::NEAREST);
            selection.magnifier_texture = Some(texture.clone());
            texture
        }
    };
    selection.magnifier_draws = draws;

    let size = vec2(config.size as f32, config.size as f32);
    let screen_pointer = container.min + pointer.to_vec2();
    let position = popup_position(screen_pointer, size, config.popup_offset, ctx.screen_rect());
    let popup = Rect::from_min_size(position, size);

    let painter = ctx.layer_painter(LayerId::new(Order::Tooltip, Id::new("magnifier")));
    painter.image(
        texture.id(),
        popup,
        Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
        Color32::WHITE,
    );
    painter.rect_stroke(popup, 0.0, Stroke::new(2.0, Color32::from_gray(60)));

    if selection.magnifier.is_dirty() {
        ctx.request_repaint();
    }
}
