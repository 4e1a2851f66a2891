//! Server-sent-event framing for the completion stream.
//!
//! Body chunks arrive at arbitrary byte boundaries, possibly splitting a line
//! or a multi-byte UTF-8 character in two. [`SseDecoder`] buffers raw bytes
//! and only decodes complete lines. The `data:` lines of one event are joined
//! with `\n` and the event is dispatched at the blank line that ends it.
//! [`parse_delta`] then extracts `choices[0].delta.content` from a payload.

use crate::error::Pdf2LlmError;
use serde::Deserialize;

/// Payload that marks the end of the stream.
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental event decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// `data:` values of the event being read.
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk; returns the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.read_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the event left open when the body ends without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            self.read_line(&rest);
        }
        self.dispatch()
    }

    fn read_line(&mut self, raw: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return self.dispatch();
        }
        // Comments (":keep-alive") and other fields (event:, id:, retry:) carry no text.
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        if data.trim() == DONE_MARKER {
            Some(SseEvent::Done)
        } else if data.trim().is_empty() {
            None
        } else {
            Some(SseEvent::Data(data))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEvent {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<DeltaContent>,
}

/// Content is usually a string; some models send a list of typed chunks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeltaContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(default)]
    text: Option<String>,
}

/// Extract the text delta from one event payload.
///
/// `Ok(None)` for events without choices (usage or keep-alive payloads);
/// `Ok(Some(""))` for a choice whose content is absent or empty.
pub fn parse_delta(data: &str) -> Result<Option<String>, Pdf2LlmError> {
    let event: CompletionEvent = serde_json::from_str(data)
        .map_err(|e| Pdf2LlmError::answer(format!("Malformed stream event: {e}")))?;

    let Some(choice) = event.choices.into_iter().next() else {
        return Ok(None);
    };

    let text = match choice.delta.content {
        None => String::new(),
        Some(DeltaContent::Text(s)) => s,
        Some(DeltaContent::Chunks(chunks)) => chunks.into_iter().filter_map(|c| c.text).collect(),
    };
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_events_split_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.push(b"data: {\"a\"").is_empty());
        assert!(dec.push(b":1}\n").is_empty());
        let events = dec.push(b"\ndata: [DONE]\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":1}".into()), SseEvent::Done]
        );
    }

    #[test]
    fn joins_data_lines_of_one_event() {
        let mut dec = SseDecoder::new();
        let events = dec.push(b"data: {\"a\":\ndata: 1}\n\ndata: x\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Data("{\"a\":\n1}".into()), SseEvent::Data("x".into())]
        );
    }

    #[test]
    fn keeps_multibyte_characters_split_across_chunks() {
        let text = "data: héllo\n\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut dec = SseDecoder::new();
        assert!(dec.push(&text[..split]).is_empty());
        assert_eq!(dec.push(&text[split..]), vec![SseEvent::Data("héllo".into())]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut dec = SseDecoder::new();
        let events = dec.push(b": ping\r\n\r\nevent: message\r\nid: 4\r\ndata: x\r\n\r\n");
        assert_eq!(events, vec![SseEvent::Data("x".into())]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut dec = SseDecoder::new();
        assert!(dec.push(b"data: head\ndata: tail").is_empty());
        assert_eq!(dec.finish(), Some(SseEvent::Data("head\ntail".into())));
        assert_eq!(dec.finish(), None);
    }

    #[test]
    fn parse_delta_string_content() {
        let d = parse_delta(r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#).unwrap();
        assert_eq!(d.as_deref(), Some("Hel"));
    }

    #[test]
    fn parse_delta_absent_content_is_empty_fragment() {
        let d = parse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(d.as_deref(), Some(""));
        let d = parse_delta(r#"{"choices":[{"delta":{"content":null}}]}"#).unwrap();
        assert_eq!(d.as_deref(), Some(""));
    }

    #[test]
    fn parse_delta_chunk_list() {
        let d = parse_delta(
            r#"{"choices":[{"delta":{"content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(d.as_deref(), Some("ab"));
    }

    #[test]
    fn parse_delta_without_choices() {
        let d = parse_delta(r#"{"usage":{"total_tokens":3}}"#).unwrap();
        assert_eq!(d, None);
    }

    #[test]
    fn parse_delta_rejects_garbage() {
        let err = parse_delta("not json").unwrap_err();
        assert!(matches!(err, Pdf2LlmError::AnswerService { .. }));
    }
}
