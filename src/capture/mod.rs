//! Serialized capture pipeline.
//!
//! Captures are queued FIFO and executed by a single pump: one task renders at
//! a time, a failed task is reported to its caller only, and the pump always
//! moves on to the next one. Producers enqueue and wake the pump; only the
//! pump itself flips the running flag.

mod crop;
mod task;

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures::channel::oneshot;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crop::{ImageEncoding, crop, encode};
pub use task::{CaptureResult, CaptureStatus, CaptureTask, CaptureTicket};

use crate::error::CaptureError;
use crate::geometry::SelectionRect;
use crate::preview::PreviewStore;
use crate::surface::SurfaceRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub jpeg_quality: u8,
    /// Finished task records kept for [`CaptureQueue::task_status`].
    pub history_limit: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            history_limit: 64,
        }
    }
}

type Reply = oneshot::Sender<Result<CaptureResult, CaptureError>>;

#[derive(Default)]
struct QueueState {
    queued: VecDeque<(CaptureTask, Reply)>,
    current: Option<CaptureTask>,
    finished: VecDeque<CaptureTask>,
    running: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    surfaces: SurfaceRegistry,
    previews: PreviewStore,
    settings: CaptureSettings,
}

/// FIFO of capture tasks with a single-flight pump on a tokio runtime.
#[derive(Clone)]
pub struct CaptureQueue {
    shared: Arc<Shared>,
    runtime: tokio::runtime::Handle,
}

impl std::fmt::Debug for CaptureQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("CaptureQueue")
            .field("queued", &state.queued.len())
            .field("current", &state.current)
            .field("running", &state.running)
            .finish_non_exhaustive()
    }
}

impl CaptureQueue {
    pub fn new(
        runtime: tokio::runtime::Handle,
        surfaces: SurfaceRegistry,
        previews: PreviewStore,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                surfaces,
                previews,
                settings,
            }),
            runtime,
        }
    }

    /// Queue a cropped capture of `target_surface`, delivered as JPEG.
    pub fn enqueue(&self, target_surface: impl Into<String>, crop: SelectionRect) -> CaptureTicket {
        self.push(CaptureTask::new(target_surface.into(), Some(crop)))
    }

    /// Queue a capture of the whole surface, delivered as PNG.
    pub fn capture_full(&self, target_surface: impl Into<String>) -> CaptureTicket {
        self.push(CaptureTask::new(target_surface.into(), None))
    }

    fn push(&self, task: CaptureTask) -> CaptureTicket {
        let (reply, receiver) = oneshot::channel();
        let ticket = CaptureTicket::new(task.id, receiver);
        debug!("queueing capture {} of {}", task.id, task.target_surface);
        self.shared.state.lock().queued.push_back((task, reply));

        // Wake the pump. If one is already draining the queue this one exits
        // immediately.
        self.runtime.spawn(pump(self.shared.clone()));
        ticket
    }

    /// Tasks waiting behind the one currently running.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queued.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    pub fn task_status(&self, id: Uuid) -> Option<CaptureStatus> {
        let state = self.shared.state.lock();
        state
            .current
            .iter()
            .chain(state.queued.iter().map(|(task, _)| task))
            .chain(state.finished.iter())
            .find(|task| task.id == id)
            .map(|task| task.status)
    }
}

async fn pump(shared: Arc<Shared>) {
    {
        let mut state = shared.state.lock();
        if state.running {
            return;
        }
        state.running = true;
    }

    loop {
        let next = {
            let mut state = shared.state.lock();
            match state.queued.pop_front() {
                Some((mut task, reply)) => {
                    task.status = CaptureStatus::Running;
                    state.current = Some(task.clone());
                    Some((task, reply))
                }
                None => {
                    state.running = false;
                    None
                }
            }
        };
        let Some((mut task, reply)) = next else {
            return;
        };

        let worker = shared.clone();
        let job = task.clone();
        let result = match tokio::task::spawn_blocking(move || execute(&worker, &job)).await {
            Ok(result) => result,
            Err(join_error) => Err(CaptureError::RenderFailed {
                surface: task.target_surface.clone(),
                reason: join_error.to_string(),
            }),
        };

        match &result {
            Ok(capture) => {
                task.status = CaptureStatus::Done;
                info!(
                    "capture {} done: {}x{} {} ({} bytes)",
                    task.id,
                    capture.width,
                    capture.height,
                    capture.encoding.mime(),
                    capture.bytes.len()
                );
            }
            Err(err) => {
                task.status = CaptureStatus::Failed;
                warn!("capture {} failed: {}", task.id, err);
            }
        }

        {
            let mut state = shared.state.lock();
            state.current = None;
            state.finished.push_back(task);
            while state.finished.len() > shared.settings.history_limit {
                state.finished.pop_front();
            }
        }

        if let Err(Ok(orphaned)) = reply.send(result) {
            // Nobody is waiting for this capture any more.
            shared.previews.revoke(&orphaned.preview);
        }
    }
}

fn execute(shared: &Shared, task: &CaptureTask) -> Result<CaptureResult, CaptureError> {
    let surface = shared
        .surfaces
        .get(&task.target_surface)
        .ok_or_else(|| CaptureError::NotFound(task.target_surface.clone()))?;

    let full = surface.render()?;
    let expected = surface.logical_size();
    if full.dimensions() != expected {
        return Err(CaptureError::RenderFailed {
            surface: task.target_surface.clone(),
            reason: format!(
                "rendered {}x{}, expected {}x{}",
                full.width(),
                full.height(),
                expected.0,
                expected.1
            ),
        });
    }

    let (image, encoding) = match task.crop {
        Some(rect) => (crop(&full, rect.pixel_bounds())?, ImageEncoding::Jpeg),
        None => (full, ImageEncoding::Png),
    };

    let bytes = Bytes::from(encode(&image, encoding, shared.settings.jpeg_quality)?);
    let preview = shared.previews.register(bytes.clone(), encoding);

    Ok(CaptureResult {
        bytes,
        preview,
        encoding,
        width: image.width(),
        height: image.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RasterSurface, Surface};
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many renders overlap and the order they ran in.
    struct SlowSurface {
        id: String,
        active: AtomicUsize,
        max_active: AtomicUsize,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Surface for SlowSurface {
        fn id(&self) -> &str {
            &self.id
        }

        fn logical_size(&self) -> (u32, u32) {
            (64, 48)
        }

        fn render(&self) -> Result<RgbaImage, CaptureError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.log.lock().push(self.id.clone());
            std::thread::sleep(Duration::from_millis(20));
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(RgbaImage::from_pixel(64, 48, Rgba([0, 128, 255, 255])))
        }
    }

    fn queue_with(surfaces: &SurfaceRegistry, previews: &PreviewStore) -> CaptureQueue {
        CaptureQueue::new(
            tokio::runtime::Handle::current(),
            surfaces.clone(),
            previews.clone(),
            CaptureSettings::default(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn tasks_run_one_at_a_time_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let surfaces = SurfaceRegistry::new();
        let mut slow_surfaces = Vec::new();
        for id in ["first", "second", "third"] {
            let surface = Arc::new(SlowSurface {
                id: id.to_owned(),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                log: log.clone(),
            });
            surfaces.register(surface.clone());
            slow_surfaces.push(surface);
        }
        let previews = PreviewStore::new();
        let queue = queue_with(&surfaces, &previews);

        let rect = SelectionRect::new(4.0, 4.0, 30.0, 20.0);
        let tickets: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|id| queue.enqueue(id, rect))
            .collect();

        for ticket in tickets {
            let result = ticket.wait().await.unwrap();
            assert_eq!((result.width, result.height), (30, 20));
            assert_eq!(result.encoding, ImageEncoding::Jpeg);
            assert!(previews.is_live(&result.preview));
        }

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
        assert!(slow_surfaces.iter().all(|surface| surface.max_active.load(Ordering::SeqCst) == 1));
        assert!(!queue.is_running());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn missing_surface_fails_only_its_own_task() {
        let surfaces = SurfaceRegistry::new();
        surfaces.register(Arc::new(RasterSurface::new("viewer", (80, 60))));
        let previews = PreviewStore::new();
        let queue = queue_with(&surfaces, &previews);

        let missing = queue.enqueue("nowhere", SelectionRect::new(0.0, 0.0, 20.0, 20.0));
        let present = queue.enqueue("viewer", SelectionRect::new(10.0, 10.0, 20.0, 20.0));
        let missing_id = missing.id();

        assert!(matches!(missing.wait().await, Err(CaptureError::NotFound(id)) if id == "nowhere"));
        let result = present.wait().await.unwrap();
        assert_eq!((result.width, result.height), (20, 20));
        assert_eq!(queue.task_status(missing_id), Some(CaptureStatus::Failed));
    }

    #[tokio::test]
    async fn full_capture_is_png_at_logical_size() {
        let surfaces = SurfaceRegistry::new();
        surfaces.register(Arc::new(RasterSurface::new("viewer", (80, 60))));
        let previews = PreviewStore::new();
        let queue = queue_with(&surfaces, &previews);

        let ticket = queue.capture_full("viewer");
        let id = ticket.id();
        let result = ticket.wait().await.unwrap();
        assert_eq!(result.encoding, ImageEncoding::Png);
        assert_eq!((result.width, result.height), (80, 60));
        assert_eq!(queue.task_status(id), Some(CaptureStatus::Done));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 60));
    }

    #[tokio::test]
    async fn crop_outside_the_render_is_reported() {
        let surfaces = SurfaceRegistry::new();
        surfaces.register(Arc::new(RasterSurface::new("viewer", (40, 40))));
        let queue = queue_with(&surfaces, &PreviewStore::new());

        let result = queue.enqueue("viewer", SelectionRect::new(30.0, 30.0, 20.0, 20.0)).wait().await;
        assert!(matches!(result, Err(CaptureError::CropOutOfBounds { .. })));
    }

    #[tokio::test]
    async fn abandoned_results_release_their_preview() {
        let surfaces = SurfaceRegistry::new();
        surfaces.register(Arc::new(RasterSurface::new("viewer", (40, 40))));
        let previews = PreviewStore::new();
        let queue = queue_with(&surfaces, &previews);

        drop(queue.capture_full("viewer"));
        // A later task finishing means the abandoned one has been handled.
        queue.capture_full("viewer").wait().await.map(|result| previews.revoke(&result.preview)).unwrap();
        assert!(previews.is_empty());
    }
}
