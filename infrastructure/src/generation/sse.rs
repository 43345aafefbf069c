//! Server-sent events decoding.
//!
//! [`SseDecoder`] is fed raw body chunks as they arrive and yields complete
//! events. Chunks may split lines, and even UTF-8 sequences, at any byte.
//! Only the fields a chat completion stream uses are kept: `data:` lines
//! (joined with `\n` when an event has several) and `event:`.

/// One assembled event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// OpenAI's end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    pending: Option<SseEvent>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.apply_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the event left open when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.apply_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.pending.take()
    }

    fn apply_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.pending.take();
        }
        // Comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                let pending = self.pending.get_or_insert_with(SseEvent::default);
                if !pending.data.is_empty() {
                    pending.data.push('\n');
                }
                pending.data.push_str(value);
            }
            "event" => {
                self.pending.get_or_insert_with(SseEvent::default).event = Some(value.to_string());
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(events: &[SseEvent]) -> Vec<&str> {
        events.iter().map(|e| e.data.as_str()).collect()
    }

    #[test]
    fn splits_events_on_blank_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: one\n\ndata: two\n\n");
        assert_eq!(data(&events), vec!["one", "two"]);
    }

    #[test]
    fn lines_may_span_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert!(decoder.feed(b":1}\r\n").is_empty());
        let events = decoder.feed(b"\r\n");
        assert_eq!(data(&events), vec!["{\"a\":1}"]);
    }

    #[test]
    fn utf8_split_across_chunks_is_kept_intact() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: あ\n\n".as_bytes();
        // Cut inside the three-byte character.
        assert!(decoder.feed(&bytes[..7]).is_empty());
        let events = decoder.feed(&bytes[7..]);
        assert_eq!(data(&events), vec!["あ"]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: delta\ndata: a\ndata: b\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("delta"));
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn comments_are_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: [DONE]").is_empty());
        let last = decoder.finish().unwrap();
        assert!(last.is_done());
        assert!(decoder.finish().is_none());
    }
}
