use std::fmt::Display;
use std::pin::pin;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::{Stream, StreamExt};
use log::{debug, info};
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parser::StreamParser;
use super::session::{ChatSession, UserQuestion};
use crate::capture::ImageEncoding;
use crate::error::StreamError;

/// Name the screenshot part is uploaded under, whatever its encoding.
pub const SCREENSHOT_FILE_NAME: &str = "screenshot.png";

/// What kind of document the question is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionMode {
    #[default]
    Video,
    Pdf,
}

impl QuestionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionMode::Video => "video",
            QuestionMode::Pdf => "pdf",
        }
    }
}

impl std::str::FromStr for QuestionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "video" => Ok(QuestionMode::Video),
            "pdf" => Ok(QuestionMode::Pdf),
            other => Err(format!("unknown mode '{}', expected video or pdf", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Bytes,
    pub encoding: ImageEncoding,
}

/// One outbound question, sent as a multipart form.
#[derive(Debug, Clone)]
pub struct QuestionRequest {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub mode: QuestionMode,
    pub screenshot: Option<Attachment>,
}

impl QuestionRequest {
    pub fn new(question: &UserQuestion, mode: QuestionMode, screenshot: Option<Attachment>) -> Self {
        Self {
            message: question.text.clone(),
            timestamp: question.timestamp,
            mode,
            screenshot,
        }
    }

    /// The text fields of the form, in upload order.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("message", self.message.clone()),
            ("timestamp", self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("mode", self.mode.as_str().to_owned()),
        ]
    }

    fn to_form(&self) -> Result<Form, StreamError> {
        let mut form = Form::new();
        for (name, value) in self.form_fields() {
            form = form.text(name, value);
        }
        if let Some(screenshot) = &self.screenshot {
            let part = Part::stream(screenshot.bytes.clone())
                .file_name(SCREENSHOT_FILE_NAME)
                .mime_str(screenshot.encoding.mime())?;
            form = form.part("screenshot", part);
        }
        Ok(form)
    }
}

/// Posts questions and feeds the streamed answer into a [`ChatSession`].
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `request` and stream the reply into the answer `answer_id`.
    ///
    /// Every failure is also recorded on the answer, so callers may ignore the
    /// returned error. `notify` runs after each batch of session updates.
    pub async fn ask<F>(
        &self,
        request: QuestionRequest,
        answer_id: Uuid,
        session: &Mutex<ChatSession>,
        notify: F,
    ) -> Result<(), StreamError>
    where
        F: Fn(),
    {
        info!(
            "asking {} ({} mode, screenshot: {})",
            self.endpoint,
            request.mode.as_str(),
            request.screenshot.is_some()
        );

        let response = match self.send(&request).await {
            Ok(response) => response,
            Err(err) => {
                fail_answer(session, answer_id, &err);
                notify();
                return Err(err);
            }
        };

        drive_stream(response.bytes_stream(), answer_id, session, notify).await
    }

    async fn send(&self, request: &QuestionRequest) -> Result<reqwest::Response, StreamError> {
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(request.to_form()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Pull chunks from `stream` until it closes or the answer is finalized.
///
/// Reading stops early once `answer_id` is no longer the session's active
/// answer, either because a terminal event arrived or the transcript was
/// cleared.
pub async fn drive_stream<S, B, E, F>(
    stream: S,
    answer_id: Uuid,
    session: &Mutex<ChatSession>,
    notify: F,
) -> Result<(), StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    F: Fn(),
{
    let mut stream = pin!(stream);
    let mut parser = StreamParser::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                let err = StreamError::Read(err.to_string());
                fail_answer(session, answer_id, &err);
                notify();
                return Err(err);
            }
        };

        let events = parser.feed(chunk.as_ref());
        if events.is_empty() {
            continue;
        }

        let still_active = {
            let mut session = session.lock();
            for event in &events {
                if !session.is_active(answer_id) {
                    break;
                }
                session.apply(event);
            }
            session.is_active(answer_id)
        };
        notify();
        if !still_active {
            debug!("answer {} finalized, closing stream", answer_id);
            return Ok(());
        }
    }

    {
        let mut session = session.lock();
        if let Some(event) = parser.finish() {
            if session.is_active(answer_id) {
                session.apply(&event);
            }
        }
        if session.is_active(answer_id) {
            session.stream_ended();
        }
    }
    notify();
    Ok(())
}

fn fail_answer(session: &Mutex<ChatSession>, answer_id: Uuid, err: &StreamError) {
    let mut session = session.lock();
    if session.is_active(answer_id) {
        session.fail(err);
    }
}
