use bytes::Bytes;
use futures::channel::oneshot;
use uuid::Uuid;

use super::ImageEncoding;
use crate::error::CaptureError;
use crate::geometry::SelectionRect;
use crate::preview::PreviewRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Queued,
    Running,
    Done,
    Failed,
}

/// One unit of "render surface → crop → encode" work.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureTask {
    pub id: Uuid,
    pub target_surface: String,
    /// `None` captures the whole surface.
    pub crop: Option<SelectionRect>,
    pub status: CaptureStatus,
}

impl CaptureTask {
    pub(crate) fn new(target_surface: String, crop: Option<SelectionRect>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_surface,
            crop,
            status: CaptureStatus::Queued,
        }
    }
}

/// A finished capture. The caller owns `preview` and must release it.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub bytes: Bytes,
    pub preview: PreviewRef,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
}

/// The caller's side of a queued capture.
#[derive(Debug)]
pub struct CaptureTicket {
    id: Uuid,
    receiver: oneshot::Receiver<Result<CaptureResult, CaptureError>>,
}

impl CaptureTicket {
    pub(crate) fn new(id: Uuid, receiver: oneshot::Receiver<Result<CaptureResult, CaptureError>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the task to finish.
    pub async fn wait(self) -> Result<CaptureResult, CaptureError> {
        self.receiver.await.unwrap_or(Err(CaptureError::Dropped))
    }

    /// Non-blocking poll for UI code; `None` while the task is still pending.
    pub fn try_take(&mut self) -> Option<Result<CaptureResult, CaptureError>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(CaptureError::Dropped)),
        }
    }
}
