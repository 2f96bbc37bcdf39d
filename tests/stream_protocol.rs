use futures::stream;
use parking_lot::Mutex;
use snip_ask::stream::{ChatEntry, DEFAULT_PLACEHOLDER, drive_stream};
use snip_ask::{ChatSession, MessageStatus, StreamEvent, StreamParser};

const RECORDS: &str = concat!(
    "data: {\"type\":\"user_saved\",\"message\":\"saved\"}\n",
    "data: {\"type\":\"processing\",\"message\":\"reading the capture\"}\n",
    "data: {\"type\":\"content\",\"content\":\"Hel\"}\n",
    "data: {\"type\":\"content\",",
    "\"content\":\"lo\"}\n",
    "data: {\"type\":\"done\"}\n",
);

fn last_answer(session: &Mutex<ChatSession>) -> (String, MessageStatus) {
    match session.lock().entries().last() {
        Some(ChatEntry::Assistant(message)) => (message.text.clone(), message.status),
        other => panic!("expected an answer, got {:?}", other),
    }
}

#[test]
fn test_three_way_splits_reassemble() {
    let bytes = RECORDS.as_bytes();

    // Every pair of cut points, including ones inside the JSON
    for first in 0..bytes.len() {
        for second in (first..bytes.len()).step_by(7) {
            let mut parser = StreamParser::new();
            let mut session = ChatSession::default();
            session.submit_question("what does this say?", None).unwrap();

            for chunk in [&bytes[..first], &bytes[first..second], &bytes[second..]] {
                for event in parser.feed(chunk) {
                    session.apply(&event);
                }
            }
            if let Some(event) = parser.finish() {
                session.apply(&event);
            }

            match session.entries().last() {
                Some(ChatEntry::Assistant(message)) => {
                    assert_eq!(message.text, "Hello", "cuts at {} and {}", first, second);
                    assert_eq!(message.status, MessageStatus::Complete);
                }
                other => panic!("expected an answer, got {:?}", other),
            }
        }
    }
}

#[test]
fn test_status_events_do_not_touch_the_placeholder() {
    let mut parser = StreamParser::new();
    let mut session = ChatSession::default();
    session.submit_question("q", None).unwrap();

    let events = parser.feed(
        b"data: {\"type\":\"user_saved\",\"message\":\"ok\"}\ndata: {\"type\":\"processing\",\"message\":\"...\"}\n",
    );
    assert_eq!(events.len(), 2);
    for event in &events {
        session.apply(event);
    }

    let message = session.active_message().unwrap();
    assert_eq!(message.status, MessageStatus::Preparing);
    assert_eq!(message.text, DEFAULT_PLACEHOLDER);
}

#[test]
fn test_error_record_marks_the_answer() {
    let mut parser = StreamParser::new();
    let mut session = ChatSession::default();
    session.submit_question("q", None).unwrap();

    for event in parser.feed(b"data: {\"error\":\"rate limited\"}\n") {
        assert_eq!(event, StreamEvent::Error("rate limited".into()));
        session.apply(&event);
    }

    let message = match session.entries().last() {
        Some(ChatEntry::Assistant(message)) => message.clone(),
        other => panic!("expected an answer, got {:?}", other),
    };
    assert_eq!(message.text, "❌ rate limited");
    assert_eq!(message.status, MessageStatus::Errored);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_driven_stream_completes_the_answer() {
    let mut session = ChatSession::default();
    let answer_id = session.submit_question("what does this say?", None).unwrap().answer_id;
    let session = Mutex::new(session);

    let bytes = RECORDS.as_bytes();
    let chunks: Vec<Result<&[u8], std::io::Error>> = bytes.chunks(5).map(Ok).collect();
    drive_stream(stream::iter(chunks), answer_id, &session, || {}).await.unwrap();

    assert_eq!(last_answer(&session), ("Hello".to_owned(), MessageStatus::Complete));
    assert!(!session.lock().is_busy());
}
