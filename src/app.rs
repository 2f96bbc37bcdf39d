use std::sync::Arc;

use egui::{ColorImage, TextureHandle, TextureOptions, Vec2, vec2};
use parking_lot::Mutex;

use crate::capture::{CaptureQueue, CaptureTicket};
use crate::config::AppConfig;
use crate::error::{SelectionError, StreamError};
use crate::file_handler::{FileHandler, LoadedDocument};
use crate::magnifier::Magnifier;
use crate::panels::{chat_panel, viewer_panel};
use crate::preview::{PreviewSlot, PreviewStore};
use crate::selection::{SelectionEngine, SelectionState};
use crate::stream::{Attachment, ChatClient, ChatSession, QuestionRequest};
use crate::surface::{NestedSurface, RasterSurface, Surface, SurfaceRegistry};

/// Surface id of the document viewer.
pub const VIEWER_SURFACE_ID: &str = "document-viewer";

/// State kept across restarts.
#[derive(serde::Deserialize, serde::Serialize, Debug, Default)]
#[serde(default)]
struct PersistedState {
    draft: String,
}

/// The document currently displayed, laid out for the current container.
pub(crate) struct DocumentView {
    pub(crate) document: Option<LoadedDocument>,
    pub(crate) texture: Option<TextureHandle>,
    /// Container size the surface was last laid out for.
    pub(crate) container: Vec2,
    pub(crate) surface: Arc<RasterSurface>,
}

impl DocumentView {
    fn blank() -> Self {
        Self {
            document: None,
            texture: None,
            container: Vec2::ZERO,
            surface: Arc::new(RasterSurface::new(VIEWER_SURFACE_ID, (0, 0))),
        }
    }

    /// The page's nested layer, if a document is loaded.
    pub(crate) fn page(&self) -> Option<&NestedSurface> {
        self.surface.nested()
    }
}

/// An in-flight capture and what it was taken for.
pub(crate) struct PendingCapture {
    ticket: CaptureTicket,
    /// The capture crops the active selection.
    from_selection: bool,
}

/// Selection mode: the engine plus its magnifier.
pub(crate) struct SelectionSession {
    pub(crate) engine: SelectionEngine,
    pub(crate) magnifier: Magnifier,
    pub(crate) magnifier_texture: Option<TextureHandle>,
    pub(crate) magnifier_draws: u64,
}

pub struct SnipAskApp {
    pub(crate) config: AppConfig,
    runtime: tokio::runtime::Handle,
    surfaces: SurfaceRegistry,
    pub(crate) previews: PreviewStore,
    queue: CaptureQueue,
    client: ChatClient,
    pub(crate) session: Arc<Mutex<ChatSession>>,
    pub(crate) view: DocumentView,
    pub(crate) selection: Option<SelectionSession>,
    pending_capture: Option<PendingCapture>,
    /// Screenshot attached to the next question.
    pub(crate) screenshot: PreviewSlot,
    pub(crate) draft: String,
    /// Last problem worth showing inline.
    pub(crate) notice: Option<String>,
    file_handler: FileHandler,
}

impl SnipAskApp {
    /// Called once before the first frame.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        runtime: tokio::runtime::Handle,
        document: Option<LoadedDocument>,
    ) -> Self {
        let persisted: PersistedState = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        let mut app = Self::headless(config, runtime);
        app.draft = persisted.draft;
        if let Some(document) = document {
            app.open_document(&cc.egui_ctx, document);
        }
        app
    }

    /// Everything except the window: usable without a graphics context.
    pub fn headless(config: AppConfig, runtime: tokio::runtime::Handle) -> Self {
        let surfaces = SurfaceRegistry::new();
        let previews = PreviewStore::new();
        let queue = CaptureQueue::new(runtime.clone(), surfaces.clone(), previews.clone(), config.capture.clone());
        let client = ChatClient::new(config.chat_endpoint());
        let session = Arc::new(Mutex::new(ChatSession::new(config.placeholder_text.clone())));
        let view = DocumentView::blank();
        surfaces.register(view.surface.clone());

        Self {
            screenshot: PreviewSlot::new(previews.clone()),
            config,
            runtime,
            surfaces,
            previews,
            queue,
            client,
            session,
            view,
            selection: None,
            pending_capture: None,
            draft: String::new(),
            notice: None,
            file_handler: FileHandler::new(),
        }
    }

    pub fn open_document(&mut self, ctx: &egui::Context, document: LoadedDocument) {
        let pixels = document.pixels.as_ref();
        let size = [pixels.width() as usize, pixels.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, pixels.as_flat_samples().as_slice());
        self.view.texture = Some(ctx.load_texture(document.name.clone(), image, TextureOptions::LINEAR));
        self.view.document = Some(document);
        self.end_selection();

        let container = self.view.container;
        self.view.container = Vec2::ZERO;
        self.layout_viewer(container);
    }

    /// Fit the page into a container of `size` and republish the viewer surface.
    pub(crate) fn layout_viewer(&mut self, size: Vec2) {
        if size == self.view.container {
            return;
        }
        self.view.container = size;

        let container = (size.x.max(0.0).floor() as u32, size.y.max(0.0).floor() as u32);
        // Selections are made against the same whole-pixel size the surface renders at.
        let logical = vec2(container.0 as f32, container.1 as f32);
        let mut surface = RasterSurface::new(VIEWER_SURFACE_ID, container);
        if let Some(document) = &self.view.document {
            let (width, height) = document.pixels.dimensions();
            let fit = (size.x / width as f32).min(size.y / height as f32).min(1.0);
            let display = vec2((width as f32 * fit).floor(), (height as f32 * fit).floor());
            if display.x >= 1.0 && display.y >= 1.0 {
                let offset = ((size - display) * 0.5).floor();
                surface = surface.with_layer(NestedSurface::new(offset, display, document.pixels.clone()));
            }
        }

        self.view.surface = Arc::new(surface);
        self.surfaces.register(self.view.surface.clone());

        if let Some(selection) = &mut self.selection {
            selection.engine.set_container_size(logical);
            selection.magnifier = Magnifier::for_surface(self.view.surface.clone(), &self.config.magnifier);
        }
    }

    pub(crate) fn capture_in_flight(&self) -> bool {
        self.pending_capture.is_some()
    }

    pub(crate) fn start_selection(&mut self) {
        if self.selection.is_some() || self.capture_in_flight() {
            return;
        }
        let engine = match SelectionEngine::for_surface(&self.surfaces, VIEWER_SURFACE_ID) {
            Ok(engine) => engine,
            Err(err) => return self.report_selection_error(err),
        };
        log::debug!("selection mode on");
        self.notice = None;
        self.selection = Some(SelectionSession {
            engine,
            magnifier: Magnifier::for_surface(self.view.surface.clone(), &self.config.magnifier),
            magnifier_texture: None,
            magnifier_draws: 0,
        });
    }

    pub(crate) fn end_selection(&mut self) {
        if let Some(mut selection) = self.selection.take() {
            selection.magnifier.end_session();
            log::debug!("selection mode off ({})", selection.engine.state().name());
        }
    }

    pub(crate) fn cancel_selection(&mut self) {
        if let Some(selection) = &mut self.selection {
            if selection.engine.is_suspended() {
                return;
            }
            selection.engine.cancel();
        }
        self.end_selection();
    }

    /// Capture the confirmed selection as the next question's screenshot.
    pub(crate) fn capture_selection(&mut self) {
        let Some(selection) = &mut self.selection else {
            return;
        };
        match selection.engine.hold_for_capture() {
            Ok(rect) => {
                selection.magnifier.end_session();
                let ticket = self.queue.enqueue(selection.engine.target_surface(), rect);
                self.pending_capture = Some(PendingCapture {
                    ticket,
                    from_selection: true,
                });
            }
            Err(err) => self.report_selection_error(err),
        }
    }

    /// Capture the whole viewer as the next question's screenshot.
    pub(crate) fn capture_page(&mut self) {
        if self.capture_in_flight() {
            return;
        }
        self.end_selection();
        let ticket = self.queue.capture_full(VIEWER_SURFACE_ID);
        self.pending_capture = Some(PendingCapture {
            ticket,
            from_selection: false,
        });
    }

    fn poll_capture(&mut self) {
        let Some(pending) = &mut self.pending_capture else {
            return;
        };
        let Some(result) = pending.ticket.try_take() else {
            return;
        };
        let from_selection = pending.from_selection;
        self.pending_capture = None;

        match result {
            Ok(capture) => {
                self.screenshot.show(capture.preview);
                self.notice = None;
                if from_selection {
                    if let Some(selection) = &mut self.selection {
                        selection.engine.capture_finished(true);
                    }
                    self.end_selection();
                }
            }
            Err(err) => {
                log::error!("capture failed: {}", err);
                self.notice = Some(format!("Capture failed: {}", err));
                if from_selection {
                    if let Some(selection) = &mut self.selection {
                        selection.engine.capture_finished(false);
                    }
                }
            }
        }
    }

    pub(crate) fn report_selection_error(&mut self, err: SelectionError) {
        match err {
            SelectionError::TooSmall { .. } => log::debug!("{}", err),
            _ => {
                log::warn!("{}", err);
                self.notice = Some(err.to_string());
            }
        }
    }

    pub(crate) fn is_answering(&self) -> bool {
        self.session.lock().is_busy()
    }

    /// Submit the draft with the attached screenshot and stream the answer.
    pub(crate) fn send_question(&mut self, ctx: &egui::Context) {
        let submitted = self
            .session
            .lock()
            .submit_question(&self.draft, self.screenshot.current().cloned());
        let submitted = match submitted {
            Ok(submitted) => submitted,
            Err(StreamError::EmptyQuestion) => return,
            Err(err) => {
                self.notice = Some(err.to_string());
                return;
            }
        };

        // The transcript now owns the screenshot.
        let attachment = self.screenshot.take().and_then(|preview| {
            Some(Attachment {
                bytes: self.previews.bytes(&preview)?,
                encoding: self.previews.encoding(&preview)?,
            })
        });
        self.draft.clear();
        self.notice = None;

        let request = QuestionRequest::new(&submitted.question, self.config.mode, attachment);
        let client = self.client.clone();
        let session = self.session.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let notify = || ctx.request_repaint();
            if let Err(err) = client.ask(request, submitted.answer_id, &session, notify).await {
                log::warn!("question {} failed: {}", submitted.question.id, err);
            }
        });
    }

    pub(crate) fn clear_chat(&mut self) {
        let released = self.session.lock().clear();
        for preview in released {
            self.previews.revoke(&preview);
        }
    }

    pub(crate) fn selection_state(&self) -> Option<&SelectionState> {
        self.selection.as_ref().map(|selection| selection.engine.state())
    }
}

impl eframe::App for SnipAskApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let state = PersistedState {
            draft: self.draft.clone(),
        };
        eframe::set_value(storage, eframe::APP_KEY, &state);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.file_handler.check_for_dropped_files(ctx) {
            match self.file_handler.take_document() {
                Some(Ok(document)) => self.open_document(ctx, document),
                Some(Err(err)) => {
                    log::warn!("{}", err);
                    self.notice = Some(err.to_string());
                }
                None => {}
            }
        }

        self.poll_capture();
        if self.capture_in_flight() {
            ctx.request_repaint();
        }

        chat_panel(self, ctx);
        viewer_panel(self, ctx);

        self.file_handler.preview_files_being_dropped(ctx);
    }
}
