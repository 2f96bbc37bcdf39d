mod chat_panel;
mod viewer_panel;

pub use chat_panel::chat_panel;
pub use viewer_panel::viewer_panel;
