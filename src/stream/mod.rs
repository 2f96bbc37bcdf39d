//! The answer stream: record parsing, the per-answer lifecycle and the HTTP
//! client that ties them to the chat endpoint.

mod client;
mod event;
mod parser;
mod session;

pub use client::{Attachment, ChatClient, QuestionMode, QuestionRequest, SCREENSHOT_FILE_NAME, drive_stream};
pub use event::{RECORD_PREFIX, StreamEvent, decode_line};
pub use parser::StreamParser;
pub use session::{
    APOLOGY_TEXT, ChatEntry, ChatSession, DEFAULT_PLACEHOLDER, MessageStatus, StreamMessage, Submitted, UserQuestion,
};
