use thiserror::Error;

/// Errors produced by the selection state machine.
///
/// None of these are fatal: the gesture simply does not complete and the
/// engine stays in (or returns to) a well-defined state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// The operation is not valid in the current state
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    /// The drafted rectangle was below the minimum size and was discarded
    #[error("selection too small ({width}x{height}), treated as a click")]
    TooSmall { width: f32, height: f32 },

    /// Editing is suspended while a capture of the selection is in flight
    #[error("selection is locked while a capture is running")]
    Suspended,

    /// The selection targets a surface that does not exist
    #[error("target surface not found: {0}")]
    MissingSurface(String),
}

/// Errors produced by a single capture task.
///
/// A failed task never stops the queue; the error is only delivered to the
/// task's caller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("surface not found: {0}")]
    NotFound(String),

    #[error("failed to render surface {surface}: {reason}")]
    RenderFailed { surface: String, reason: String },

    #[error("crop {width}x{height}+{left}+{top} does not fit a {source_width}x{source_height} render")]
    CropOutOfBounds {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error("failed to encode capture: {0}")]
    EncodeFailed(#[from] image::ImageError),

    /// The pump went away before delivering a result
    #[error("capture task was dropped before completing")]
    Dropped,
}

/// Errors on the question/answer stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A question is already being answered in this session
    #[error("an answer is still streaming")]
    Busy,

    #[error("question text is empty")]
    EmptyQuestion,

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("stream read failed: {0}")]
    Read(String),
}

/// Errors loading the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors opening a document for viewing.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("{0} is not a supported image")]
    Unsupported(String),

    #[error("dropped file {0} has no accessible data")]
    NoData(String),
}
