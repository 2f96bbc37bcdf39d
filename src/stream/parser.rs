use super::event::{StreamEvent, decode_line};

/// Reassembles event records from arbitrarily split byte chunks.
///
/// Bytes after the last newline are held until a later chunk completes the
/// line, so splits inside a record or inside a multi-byte character are
/// harmless.
#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and decode every line it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&byte| byte == b'\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete
            .split(|&byte| byte == b'\n')
            .filter_map(decode_bytes)
            .collect()
    }

    /// Decode whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_bytes(&rest)
    }

    /// Bytes waiting for the rest of their line.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_bytes(line: &[u8]) -> Option<StreamEvent> {
    match std::str::from_utf8(line) {
        Ok(line) => decode_line(line),
        Err(err) => {
            log::debug!("skipping non-UTF-8 line: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"type\":\"content\",\"content\":\"Hel\"}\n",
        "data: {\"type\":\"content\",",
        "\"content\":\"lo\"}\n",
        "data: {\"type\":\"done\"}\n",
    );

    fn collect(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut parser = StreamParser::new();
        let mut events: Vec<_> = chunks.iter().flat_map(|chunk| parser.feed(chunk)).collect();
        events.extend(parser.finish());
        events
    }

    fn expected() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Content("Hel".into()),
            StreamEvent::Content("lo".into()),
            StreamEvent::Done,
        ]
    }

    #[test]
    fn every_two_way_split_yields_the_same_events() {
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(split);
            assert_eq!(collect(&[head, tail]), expected(), "split at {}", split);
        }
    }

    #[test]
    fn byte_at_a_time() {
        let chunks: Vec<&[u8]> = STREAM.as_bytes().chunks(1).collect();
        assert_eq!(collect(&chunks), expected());
    }

    #[test]
    fn partial_line_is_held() {
        let mut parser = StreamParser::new();
        assert!(parser.feed(b"data: {\"type\":").is_empty());
        assert_eq!(parser.buffered(), 14);
        assert_eq!(parser.feed(b"\"done\"}\n"), vec![StreamEvent::Done]);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn multibyte_characters_survive_splits() {
        let line = "data: {\"type\":\"content\",\"content\":\"größe ✓\"}\n".as_bytes();
        let cut = line.iter().position(|&byte| byte >= 0x80).unwrap() + 1;
        let (head, tail) = line.split_at(cut);
        assert_eq!(collect(&[head, tail]), vec![StreamEvent::Content("größe ✓".into())]);
    }

    #[test]
    fn finish_flushes_an_unterminated_record() {
        let mut parser = StreamParser::new();
        assert!(parser.feed(b"data: {\"type\":\"done\"}").is_empty());
        assert_eq!(parser.finish(), Some(StreamEvent::Done));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn noise_between_records_is_skipped() {
        let events = collect(&[b"\n: ping\r\ndata: oops\ndata: {\"error\":\"boom\"}\r\n"]);
        assert_eq!(events, vec![StreamEvent::Error("boom".into())]);
    }
}
