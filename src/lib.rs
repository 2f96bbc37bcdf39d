#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod file_handler;
pub mod geometry;
pub mod magnifier;
pub mod panels;
pub mod preview;
pub mod selection;
pub mod stream;
pub mod surface;
pub mod widgets;

pub use app::SnipAskApp;
pub use capture::{CaptureQueue, CaptureResult, CaptureTicket, ImageEncoding};
pub use config::AppConfig;
pub use error::{CaptureError, ConfigError, DocumentError, SelectionError, StreamError};
pub use geometry::{ResizeHandle, SelectionRect};
pub use magnifier::Magnifier;
pub use preview::{PreviewRef, PreviewSlot, PreviewStore};
pub use selection::{SelectionEngine, SelectionState};
pub use stream::{ChatClient, ChatSession, MessageStatus, StreamEvent, StreamParser};
pub use surface::{NestedSurface, RasterSurface, Surface, SurfaceRegistry};
