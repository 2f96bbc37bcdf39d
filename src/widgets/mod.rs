mod markdown;
mod selection_overlay;

pub use markdown::{Block, Span, SpanStyle, parse_markdown, show_markdown};
pub use selection_overlay::SelectionOverlay;
