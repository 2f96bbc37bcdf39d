use log::debug;
use serde::Deserialize;

/// Prefix of every event record line.
pub const RECORD_PREFIX: &str = "data: ";

/// One decoded line of the answer stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A delta of answer text
    Content(String),
    /// The server stored the question
    UserSaved(String),
    /// Status note while the answer is being prepared
    Processing(String),
    Done,
    Error(String),
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Decode one complete line. Lines that are not event records yield `None`.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let payload = line.strip_prefix(RECORD_PREFIX)?;

    let record: RawRecord = match serde_json::from_str(payload) {
        Ok(record) => record,
        Err(err) => {
            debug!("skipping malformed record ({}): {}", err, payload);
            return None;
        }
    };

    let event = match record.kind.as_deref() {
        Some("content") => record.content.map(StreamEvent::Content),
        Some("user_saved") => Some(StreamEvent::UserSaved(record.message.unwrap_or_default())),
        Some("processing") => Some(StreamEvent::Processing(record.message.unwrap_or_default())),
        Some("done") => Some(StreamEvent::Done),
        _ => None,
    };

    let event = event.or_else(|| record.error.map(StreamEvent::Error));
    if event.is_none() {
        debug!("ignoring record: {}", payload);
    }
    event
}
