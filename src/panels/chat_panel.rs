use egui::{Color32, InputState, Key, Modifiers, RichText, ScrollArea, TextEdit, Ui, vec2};

use crate::SnipAskApp;
use crate::preview::{PreviewRef, PreviewStore};
use crate::stream::{ChatEntry, MessageStatus, StreamMessage, UserQuestion};
use crate::widgets::show_markdown;

const THUMBNAIL_WIDTH: f32 = 160.0;

pub fn chat_panel(app: &mut SnipAskApp, ctx: &egui::Context) {
    egui::SidePanel::right("chat_panel")
        .resizable(true)
        .default_width(360.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Ask");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Clear").clicked() {
                        app.clear_chat();
                    }
                    ui.weak(app.config.mode.as_str());
                });
            });
            ui.separator();

            egui::TopBottomPanel::bottom("chat_input")
                .resizable(false)
                .show_inside(ui, |ui| composer(app, ctx, ui));

            ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| transcript(app, ctx, ui));
        });
}

fn transcript(app: &SnipAskApp, ctx: &egui::Context, ui: &mut Ui) {
    let session = app.session.lock();
    if session.entries().is_empty() {
        ui.weak("Select an area of the page and ask about it.");
        return;
    }
    for entry in session.entries() {
        match entry {
            ChatEntry::User(question) => user_bubble(&app.previews, ctx, ui, question),
            ChatEntry::Assistant(message) => answer_bubble(ui, message),
        }
        ui.add_space(6.0);
    }
}

fn user_bubble(previews: &PreviewStore, ctx: &egui::Context, ui: &mut Ui, question: &UserQuestion) {
    egui::Frame::group(ui.style())
        .fill(ui.visuals().faint_bg_color)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.strong("You");
                ui.weak(question.timestamp.format("%H:%M:%S").to_string());
            });
            if let Some(preview) = &question.screenshot {
                thumbnail(previews, ctx, ui, preview);
            }
            ui.label(&question.text);
        });
}

fn answer_bubble(ui: &mut Ui, message: &StreamMessage) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.strong("Assistant");
            if message.is_streaming() {
                ui.spinner();
            }
        });
        match message.status {
            MessageStatus::Preparing => {
                ui.label(RichText::new(&message.text).italics().weak());
            }
            MessageStatus::Streaming => {
                ui.label(&message.text);
            }
            MessageStatus::Complete => show_markdown(ui, &message.text),
            MessageStatus::Errored => {
                ui.colored_label(Color32::from_rgb(200, 60, 60), &message.text);
            }
        }
        if let Some(note) = &message.note {
            ui.weak(note);
        }
    });
}

fn thumbnail(previews: &PreviewStore, ctx: &egui::Context, ui: &mut Ui, preview: &PreviewRef) {
    match previews.texture(ctx, preview) {
        Ok(texture) => {
            let size = ctx
                .tex_manager()
                .read()
                .meta(texture)
                .map(|meta| vec2(meta.size[0] as f32, meta.size[1] as f32))
                .unwrap_or(vec2(THUMBNAIL_WIDTH, THUMBNAIL_WIDTH));
            let scale = (THUMBNAIL_WIDTH / size.x).min(1.0);
            ui.image((texture, size * scale));
        }
        Err(err) => {
            log::debug!("{}: {}", preview.url(), err);
            ui.weak("[screenshot unavailable]");
        }
    }
}

fn composer(app: &mut SnipAskApp, ctx: &egui::Context, ui: &mut Ui) {
    ui.add_space(4.0);

    if let Some(preview) = app.screenshot.current().cloned() {
        ui.horizontal(|ui| {
            thumbnail(&app.previews, ctx, ui, &preview);
            if ui.small_button("✖").on_hover_text("Remove screenshot").clicked() {
                app.screenshot.clear();
            }
        });
    }

    if let Some(notice) = &app.notice {
        ui.colored_label(Color32::from_rgb(200, 60, 60), notice);
    }

    let busy = app.is_answering();
    let input_id = ui.make_persistent_id("chat_draft");
    // Taken before the text edit sees it, so the key never becomes a newline.
    let submitted_with_keyboard =
        ui.memory(|memory| memory.has_focus(input_id)) && ui.input_mut(take_send_shortcut);
    ui.add_enabled(
        !busy,
        TextEdit::multiline(&mut app.draft)
            .id(input_id)
            .hint_text("Ask about the page… (Shift+Enter for a new line)")
            .desired_rows(3)
            .desired_width(f32::INFINITY),
    );

    ui.horizontal(|ui| {
        let can_send = !busy && !app.draft.trim().is_empty();
        let clicked = ui.add_enabled(can_send, egui::Button::new("Send")).clicked();
        if can_send && (clicked || submitted_with_keyboard) {
            app.send_question(ctx);
        }
        if busy {
            ui.spinner();
            ui.weak("Answering…");
        }
    });
}

/// Enter sends; Shift+Enter is left for the text edit.
fn take_send_shortcut(input: &mut InputState) -> bool {
    !input.modifiers.shift && input.consume_key(Modifiers::NONE, Key::Enter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_enter(modifiers: Modifiers) -> (bool, bool) {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            modifiers,
            events: vec![egui::Event::Key {
                key: Key::Enter,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers,
            }],
            ..Default::default()
        };
        let mut sent = false;
        let mut left_for_editor = false;
        let _ = ctx.run(input, |ctx| {
            sent = ctx.input_mut(take_send_shortcut);
            left_for_editor = ctx.input(|i| i.key_pressed(Key::Enter));
        });
        (sent, left_for_editor)
    }

    #[test]
    fn enter_sends_and_is_consumed() {
        assert_eq!(press_enter(Modifiers::NONE), (true, false));
    }

    #[test]
    fn shift_enter_is_a_newline() {
        assert_eq!(press_enter(Modifiers::SHIFT), (false, true));
    }
}
