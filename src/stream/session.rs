use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use super::event::StreamEvent;
use crate::error::StreamError;
use crate::preview::PreviewRef;

pub const DEFAULT_PLACEHOLDER: &str = "Thinking...";

/// Shown in place of the answer when the request itself failed.
pub const APOLOGY_TEXT: &str = "Sorry, something went wrong while sending your message. Please try again later.";

const NO_ANSWER_TEXT: &str = "no answer received";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Created on submit, showing the placeholder
    Preparing,
    Streaming,
    Complete,
    Errored,
}

impl MessageStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Complete | MessageStatus::Errored)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserQuestion {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// The capture attached to the question. The session owns its release.
    pub screenshot: Option<PreviewRef>,
}

/// An answer being assembled from stream events.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    pub id: Uuid,
    pub text: String,
    pub status: MessageStatus,
    /// Last `processing` note, if any
    pub note: Option<String>,
}

impl StreamMessage {
    pub fn is_streaming(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// What [`ChatSession::submit_question`] opened.
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    pub question: UserQuestion,
    /// Id of the Preparing answer
    pub answer_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEntry {
    User(UserQuestion),
    Assistant(StreamMessage),
}

/// Transcript of one conversation with at most one answer in flight.
#[derive(Debug)]
pub struct ChatSession {
    entries: Vec<ChatEntry>,
    active: Option<usize>,
    placeholder: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl ChatSession {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            active: None,
            placeholder: placeholder.into(),
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_message(&self) -> Option<&StreamMessage> {
        match self.entries.get(self.active?) {
            Some(ChatEntry::Assistant(message)) => Some(message),
            _ => None,
        }
    }

    /// Whether `answer_id` is the answer currently in flight.
    pub fn is_active(&self, answer_id: Uuid) -> bool {
        self.active_message().is_some_and(|message| message.id == answer_id)
    }

    fn active_mut(&mut self) -> Option<&mut StreamMessage> {
        match self.entries.get_mut(self.active?) {
            Some(ChatEntry::Assistant(message)) => Some(message),
            _ => None,
        }
    }

    /// Record a question and open a Preparing answer for it.
    ///
    /// On success the session takes over releasing `screenshot`; on refusal
    /// it stays with the caller.
    pub fn submit_question(
        &mut self,
        text: &str,
        screenshot: Option<PreviewRef>,
    ) -> Result<Submitted, StreamError> {
        if self.is_busy() {
            return Err(StreamError::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(StreamError::EmptyQuestion);
        }

        let question = UserQuestion {
            id: Uuid::new_v4(),
            text: text.to_owned(),
            timestamp: Utc::now(),
            screenshot,
        };
        self.entries.push(ChatEntry::User(question.clone()));

        let message = StreamMessage {
            id: Uuid::new_v4(),
            text: self.placeholder.clone(),
            status: MessageStatus::Preparing,
            note: None,
        };
        let answer_id = message.id;
        info!("question {} submitted, answer {} preparing", question.id, answer_id);
        self.entries.push(ChatEntry::Assistant(message));
        self.active = Some(self.entries.len() - 1);

        Ok(Submitted { question, answer_id })
    }

    /// Advance the active message with one parsed event.
    pub fn apply(&mut self, event: &StreamEvent) {
        let Some(message) = self.active_mut() else {
            debug!("no active message, dropping {:?}", event);
            return;
        };

        match event {
            StreamEvent::Content(delta) => {
                if message.status == MessageStatus::Preparing {
                    message.text.clear();
                    message.status = MessageStatus::Streaming;
                }
                message.text.push_str(delta);
            }
            StreamEvent::Processing(note) => {
                message.note = Some(note.clone());
            }
            StreamEvent::UserSaved(_) => {}
            StreamEvent::Done => {
                message.status = MessageStatus::Complete;
                message.note = None;
                info!("answer {} complete ({} chars)", message.id, message.text.len());
                self.active = None;
            }
            StreamEvent::Error(error) => {
                message.text = format!("❌ {}", error);
                message.status = MessageStatus::Errored;
                message.note = None;
                warn!("answer {} failed: {}", message.id, error);
                self.active = None;
            }
        }
    }

    /// Finalize the active message after a connection-level failure.
    pub fn fail(&mut self, error: &StreamError) {
        let Some(message) = self.active_mut() else {
            return;
        };
        warn!("answer {} aborted: {}", message.id, error);
        message.text = APOLOGY_TEXT.to_owned();
        message.status = MessageStatus::Errored;
        message.note = None;
        self.active = None;
    }

    /// The connection closed. Finalizes a message no terminal event reached.
    pub fn stream_ended(&mut self) {
        let Some(message) = self.active_mut() else {
            return;
        };
        match message.status {
            MessageStatus::Streaming => {
                debug!("answer {} ended without done", message.id);
                message.status = MessageStatus::Complete;
            }
            _ => {
                warn!("answer {} ended before any content", message.id);
                message.text = format!("❌ {}", NO_ANSWER_TEXT);
                message.status = MessageStatus::Errored;
            }
        }
        message.note = None;
        self.active = None;
    }

    /// Drop the transcript, returning screenshots that still need releasing.
    ///
    /// An answer still in flight keeps streaming into nothing.
    pub fn clear(&mut self) -> Vec<PreviewRef> {
        self.active = None;
        self.entries
            .drain(..)
            .filter_map(|entry| match entry {
                ChatEntry::User(question) => question.screenshot,
                ChatEntry::Assistant(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn last_message(session: &ChatSession) -> &StreamMessage {
        match session.entries().last() {
            Some(ChatEntry::Assistant(message)) => message,
            other => panic!("expected an answer, got {:?}", other),
        }
    }

    #[test]
    fn submit_opens_a_preparing_placeholder() {
        let mut session = ChatSession::default();
        let submitted = session.submit_question("  what is this?  ", None).unwrap();

        assert_eq!(submitted.question.text, "what is this?");
        assert_eq!(session.entries().len(), 2);
        assert!(session.is_active(submitted.answer_id));
        let message = session.active_message().unwrap();
        assert_eq!(message.status, MessageStatus::Preparing);
        assert_eq!(message.text, DEFAULT_PLACEHOLDER);
    }

    #[test]
    fn first_content_replaces_then_appends() {
        let mut session = ChatSession::default();
        session.submit_question("q", None).unwrap();

        session.apply(&StreamEvent::Processing("looking".into()));
        assert_eq!(session.active_message().unwrap().status, MessageStatus::Preparing);
        assert_eq!(session.active_message().unwrap().note.as_deref(), Some("looking"));

        session.apply(&StreamEvent::Content("Hel".into()));
        assert_eq!(session.active_message().unwrap().text, "Hel");
        assert_eq!(session.active_message().unwrap().status, MessageStatus::Streaming);

        session.apply(&StreamEvent::UserSaved("saved".into()));
        session.apply(&StreamEvent::Content("lo".into()));
        session.apply(&StreamEvent::Done);

        let message = last_message(&session);
        assert_eq!(message.text, "Hello");
        assert_eq!(message.status, MessageStatus::Complete);
        assert!(!session.is_busy());
    }

    #[test]
    fn error_event_replaces_content() {
        let mut session = ChatSession::default();
        session.submit_question("q", None).unwrap();
        session.apply(&StreamEvent::Content("partial".into()));
        session.apply(&StreamEvent::Error("model offline".into()));

        let message = last_message(&session);
        assert_eq!(message.text, "❌ model offline");
        assert_eq!(message.status, MessageStatus::Errored);
        assert!(!session.is_busy());
    }

    #[test]
    fn only_one_answer_in_flight() {
        let mut session = ChatSession::default();
        session.submit_question("first", None).unwrap();
        assert!(matches!(session.submit_question("second", None), Err(StreamError::Busy)));
        assert_eq!(session.entries().len(), 2);

        session.apply(&StreamEvent::Done);
        assert!(session.submit_question("second", None).is_ok());
    }

    #[test]
    fn blank_questions_are_refused() {
        let mut session = ChatSession::default();
        assert!(matches!(session.submit_question("   ", None), Err(StreamError::EmptyQuestion)));
        assert!(session.entries().is_empty());
    }

    #[test]
    fn terminal_events_without_an_active_message_are_ignored() {
        let mut session = ChatSession::default();
        session.apply(&StreamEvent::Done);
        session.apply(&StreamEvent::Error("stray".into()));
        assert!(session.entries().is_empty());

        session.submit_question("q", None).unwrap();
        session.apply(&StreamEvent::Done);
        session.apply(&StreamEvent::Error("late".into()));
        session.apply(&StreamEvent::Content("late".into()));

        let message = last_message(&session);
        assert_eq!(message.status, MessageStatus::Complete);
        assert_eq!(message.text, DEFAULT_PLACEHOLDER);
        assert_eq!(session.entries().len(), 2);
    }

    #[test]
    fn connection_failure_shows_apology() {
        let mut session = ChatSession::default();
        session.submit_question("q", None).unwrap();
        session.fail(&StreamError::Status {
            status: 502,
            body: String::new(),
        });

        let message = last_message(&session);
        assert_eq!(message.text, APOLOGY_TEXT);
        assert_eq!(message.status, MessageStatus::Errored);
    }

    #[test]
    fn stream_end_finalizes_by_progress() {
        let mut session = ChatSession::default();
        session.submit_question("q", None).unwrap();
        session.apply(&StreamEvent::Content("answer".into()));
        session.stream_ended();
        assert_eq!(last_message(&session).status, MessageStatus::Complete);
        assert_eq!(last_message(&session).text, "answer");

        session.submit_question("q", None).unwrap();
        session.stream_ended();
        assert_eq!(last_message(&session).status, MessageStatus::Errored);
        assert!(!session.is_busy());
    }
}
